use circleview_core::{NodeKind, Vector};
use std::future::Future;
use std::pin::Pin;

/// Acknowledgement future returned by every view callback.
///
/// The view resolves it once the corresponding visual change is committed
/// (typically the end of a CSS/SVG transition). Implementations must return
/// futures that own their data; the engine may drive them after the borrow
/// of the arguments has ended.
pub type ViewAck = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub fn resolved() -> ViewAck {
    Box::pin(std::future::ready(()))
}

/// The rendering side of the diagram, one callback per visual mutation.
///
/// All methods are side-effecting on whatever the implementation draws to;
/// the layout engine only ever awaits the returned acknowledgements. The
/// asynchronous boundary of the whole engine is exactly this trait: the
/// layout math itself never yields.
pub trait NodeView: Send + Sync {
    /// The node's circle (or the root rectangle's halves) changed size.
    /// `text_offset` is the vertical offset of the label within the circle.
    fn change_radius(&self, full_name: &str, radius: f64, text_offset: f64) -> ViewAck;

    /// Animated move to a final absolute position.
    fn move_to_position(&self, full_name: &str, position: Vector) -> ViewAck;

    /// Animated move to a provisional absolute position; a later
    /// `move_to_position` or another intermediate move may supersede it.
    fn start_move_to_position(&self, full_name: &str, position: Vector) -> ViewAck;

    /// Instant reposition without a transition, used by drag gestures.
    fn jump_to_position(&self, full_name: &str, position: Vector) -> ViewAck;

    /// The root rectangle grew; the scrollable drawing region must follow.
    fn resize_viewport(&self, half_width: f64, half_height: f64) -> ViewAck;

    fn show(&self, full_name: &str) -> ViewAck;

    fn hide(&self, full_name: &str) -> ViewAck;
}

/// Label width oracle. Real implementations measure rendered text for the
/// CSS class belonging to `kind`; tests substitute fixed widths.
pub trait TextMeasure: Send + Sync {
    fn label_width(&self, text: &str, kind: NodeKind) -> f64;
}

/// View that acknowledges everything immediately. Used for headless layout
/// runs and benches, where no transition ever plays.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantView;

impl NodeView for InstantView {
    fn change_radius(&self, _full_name: &str, _radius: f64, _text_offset: f64) -> ViewAck {
        resolved()
    }

    fn move_to_position(&self, _full_name: &str, _position: Vector) -> ViewAck {
        resolved()
    }

    fn start_move_to_position(&self, _full_name: &str, _position: Vector) -> ViewAck {
        resolved()
    }

    fn jump_to_position(&self, _full_name: &str, _position: Vector) -> ViewAck {
        resolved()
    }

    fn resize_viewport(&self, _half_width: f64, _half_height: f64) -> ViewAck {
        resolved()
    }

    fn show(&self, _full_name: &str) -> ViewAck {
        resolved()
    }

    fn hide(&self, _full_name: &str) -> ViewAck {
        resolved()
    }
}

/// Monospace-style width heuristic: every character advances by the same
/// amount. Good enough where no font stack is available.
#[derive(Debug, Clone, Copy)]
pub struct CharWidthMeasure {
    pub char_width: f64,
}

impl Default for CharWidthMeasure {
    fn default() -> Self {
        Self { char_width: 7.2 }
    }
}

impl TextMeasure for CharWidthMeasure {
    fn label_width(&self, text: &str, _kind: NodeKind) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_width_measure_counts_chars() {
        let measure = CharWidthMeasure { char_width: 10.0 };
        assert_eq!(measure.label_width("Foo", NodeKind::CLASS), 30.0);
        assert_eq!(measure.label_width("", NodeKind::PACKAGE), 0.0);
    }
}
