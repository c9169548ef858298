//! Scroll-offset math shared by the renderer and the key handlers.

/// Highest scroll offset that still shows a full screen of content.
pub fn max_scroll_offset(total_lines: u16, available_height: u16) -> u16 {
    if total_lines > available_height {
        total_lines.saturating_sub(available_height)
    } else {
        0
    }
}

/// Offset that pins the view to the bottom of the transcript.
pub fn bottom_offset(total_lines: u16, available_height: u16) -> u16 {
    max_scroll_offset(total_lines, available_height)
}

/// Clamp a requested offset into the valid range.
pub fn clamp_offset(requested: u16, total_lines: u16, available_height: u16) -> u16 {
    requested.min(max_scroll_offset(total_lines, available_height))
}
