pub mod geometry;
mod index;
mod interaction;
mod join;
mod projection;
mod renderer;
mod scale;
mod scene;
mod zoom;

pub use index::GeoIndex;
pub use interaction::{
    activation, Activation, InteractionController, JoinView, PointerEvent, Tooltip, TooltipContent,
};
pub use join::{JoinSummary, KeyedIndex, Layer};
pub use projection::{Bounds, PathGenerator, Projection};
pub use renderer::{RenderState, Renderer, ViewportBox};
pub use scale::{ticks, ScaleChange, ScaleModel, SqrtScale};
pub use scene::{Bubble, CountryShape, Tween};
pub use zoom::{ZoomBehavior, ZoomTransform};
