use crate::data::{Accessor, DataRow, Metric};
use crate::map::join::{KeyedIndex, Layer};
use crate::map::scene::{Bubble, CountryShape};

/// Pointer position in host coordinates (terminal column, row)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Text shown for the hovered country
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TooltipContent {
    pub name: String,
    pub value: String,
}

impl TooltipContent {
    /// Markup for hosts that render HTML
    pub fn html(&self) -> String {
        format!("<div>{}</div><div>{}</div>", self.name, self.value)
    }
}

/// Tooltip widget; purely side-effecting
pub trait Tooltip {
    fn show(&mut self, content: &TooltipContent);
    fn move_to(&mut self, event: &PointerEvent);
    fn hide(&mut self);
}

/// Read-only view of the renderer's join state
pub struct JoinView<'a> {
    pub countries: &'a Layer<CountryShape>,
    pub bubbles: &'a Layer<Bubble>,
    pub data: Option<&'a KeyedIndex<DataRow>>,
    pub accessor: &'a Accessor,
    pub metric: Option<&'a Metric>,
}

/// Which elements are highlighted and what the tooltip says
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Activation {
    pub country: Option<String>,
    pub bubble: Option<String>,
    pub tooltip: Option<TooltipContent>,
}

impl Activation {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Derive the activation for a hovered identifier. Only the element whose
/// key equals `id` in each layer becomes active.
pub fn activation(id: &str, view: &JoinView<'_>) -> Activation {
    let tooltip = match (view.data.and_then(|d| d.get(id)), view.metric) {
        (Some(row), Some(metric)) => Some(TooltipContent {
            name: view.accessor.name(row).to_string(),
            value: metric.format(metric.value(row)),
        }),
        _ => None,
    };
    Activation {
        country: view.countries.contains(id).then(|| id.to_string()),
        bubble: view.bubbles.contains(id).then(|| id.to_string()),
        tooltip,
    }
}

/// Hover handling: derives activations and drives the tooltip widget
pub struct InteractionController<T: Tooltip> {
    tooltip: T,
}

impl<T: Tooltip> InteractionController<T> {
    pub fn new(tooltip: T) -> Self {
        Self { tooltip }
    }

    pub fn tooltip(&self) -> &T {
        &self.tooltip
    }

    pub fn pointer_enter(&mut self, id: &str, view: &JoinView<'_>, event: &PointerEvent) -> Activation {
        let activation = activation(id, view);
        match &activation.tooltip {
            Some(content) => {
                self.tooltip.show(content);
                self.tooltip.move_to(event);
            }
            None => self.tooltip.hide(),
        }
        activation
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) {
        self.tooltip.move_to(event);
    }

    pub fn pointer_leave(&mut self) -> Activation {
        self.tooltip.hide();
        Activation::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NumberFormat;
    use glam::DVec2;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Tooltip for Recorder {
        fn show(&mut self, content: &TooltipContent) {
            self.calls.push(format!("show {}", content.html()));
        }
        fn move_to(&mut self, event: &PointerEvent) {
            self.calls.push(format!("move {},{}", event.x, event.y));
        }
        fn hide(&mut self) {
            self.calls.push("hide".to_string());
        }
    }

    struct Fixture {
        countries: Layer<CountryShape>,
        bubbles: Layer<Bubble>,
        data: KeyedIndex<DataRow>,
        accessor: Accessor,
        metric: Metric,
    }

    impl Fixture {
        fn new() -> Self {
            let mut countries = Layer::new();
            countries.join(
                [("004", ()), ("008", ()), ("999", ())],
                |id, _| CountryShape::new(id != "999"),
                |_, _, _| {},
            );
            let mut bubbles = Layer::new();
            bubbles.join([("004", ()), ("008", ())], |_, _| Bubble::new(DVec2::ZERO), |_, _, _| {});
            let data = KeyedIndex::from_entries(crate::test_support::rows().into_iter().map(|r| {
                (Accessor::default().id(&r).to_string(), r)
            }));
            Self {
                countries,
                bubbles,
                data,
                accessor: Accessor::default(),
                metric: Metric::field("Population", "pop_est", NumberFormat::Grouped),
            }
        }

        fn view(&self) -> JoinView<'_> {
            JoinView {
                countries: &self.countries,
                bubbles: &self.bubbles,
                data: Some(&self.data),
                accessor: &self.accessor,
                metric: Some(&self.metric),
            }
        }
    }

    #[test]
    fn test_activation_is_pure() {
        let fixture = Fixture::new();
        let a = activation("004", &fixture.view());
        assert_eq!(a.country.as_deref(), Some("004"));
        assert_eq!(a.bubble.as_deref(), Some("004"));
        assert_eq!(
            a.tooltip,
            Some(TooltipContent {
                name: "Afghanistan".to_string(),
                value: "100".to_string(),
            })
        );

        let none = activation("999", &fixture.view());
        assert_eq!(none.country.as_deref(), Some("999"));
        assert_eq!(none.bubble, None);
        assert_eq!(none.tooltip, None);
    }

    #[test]
    fn test_enter_move_leave_drive_tooltip() {
        let fixture = Fixture::new();
        let mut controller = InteractionController::new(Recorder::default());
        controller.pointer_enter("008", &fixture.view(), &PointerEvent::new(3.0, 4.0));
        controller.pointer_move(&PointerEvent::new(5.0, 6.0));
        let cleared = controller.pointer_leave();

        assert_eq!(cleared, Activation::none());
        assert_eq!(
            controller.tooltip().calls,
            vec![
                "show <div>Albania</div><div>50</div>".to_string(),
                "move 3,4".to_string(),
                "move 5,6".to_string(),
                "hide".to_string(),
            ]
        );
    }
}
