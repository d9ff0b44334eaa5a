//! Layout inheritance - label/control spans on a 24-unit grid.

use crate::descriptor::UiDescriptor;
use crate::types::Layout;

/// Label span used when nothing on the inheritance chain sets one.
pub const DEFAULT_SPAN_LABEL: u32 = 5;

/// Control span used when nothing on the inheritance chain sets one.
pub const DEFAULT_SPAN_CONTROL: u32 = 19;

/// Apply the layout rules for one node given its parent's descriptor.
///
/// Horizontal: a fixed label width on the parent is inherited; otherwise
/// unset spans/offset inherit the parent's, falling back to 5/19. Any other
/// mode clears spans, offset and fixed width. Inline also drops `grid`.
/// A positive fixed width always clears both spans.
pub fn propagate(descriptor: &mut UiDescriptor, parent: &UiDescriptor, layout: Layout) {
    if layout == Layout::Horizontal {
        if let Some(fixed) = set(parent.span_label_fixed) {
            if set(descriptor.span_label_fixed).is_none() {
                descriptor.span_label_fixed = Some(fixed);
            }
        } else {
            descriptor.span_label = set(descriptor.span_label)
                .or(Some(parent.span_label.unwrap_or(DEFAULT_SPAN_LABEL)));
            descriptor.span_control = set(descriptor.span_control)
                .or(Some(parent.span_control.unwrap_or(DEFAULT_SPAN_CONTROL)));
            descriptor.offset_control = set(descriptor.offset_control).or(parent.offset_control);
        }
    } else {
        descriptor.span_label = None;
        descriptor.span_control = None;
        descriptor.offset_control = None;
        descriptor.span_label_fixed = None;
    }

    if layout == Layout::Inline {
        descriptor.grid = None;
    }

    if descriptor.span_label_fixed.is_some_and(|w| w > 0) {
        descriptor.span_label = None;
        descriptor.span_control = None;
    }
}

// Zero counts as unset, the way an overlay's falsy span does.
fn set(span: Option<u32>) -> Option<u32> {
    span.filter(|v| *v > 0)
}
