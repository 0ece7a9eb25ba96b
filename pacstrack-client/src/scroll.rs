//! Scroll position capture and restoration around table rebuilds.

/// Anything with a vertical scroll offset.
pub trait Viewport {
    fn scroll_offset(&self) -> f32;

    fn set_scroll_offset(&mut self, offset: f32);

    fn viewport_height(&self) -> f32 {
        0.0
    }
}

/// Lightweight scroll state, valid for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    /// Y-axis scroll position
    pub position: f32,
    /// Viewport height when saved
    pub viewport_height: f32,
}

impl ScrollState {
    /// Create from just a scroll position (for simple views)
    pub fn from_position(position: f32) -> Self {
        Self {
            position,
            viewport_height: 0.0,
        }
    }

    pub fn from_viewport<V: Viewport + ?Sized>(viewport: &V) -> Self {
        Self {
            position: viewport.scroll_offset(),
            viewport_height: viewport.viewport_height(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScrollPositionTracker;

impl ScrollPositionTracker {
    pub fn capture<V: Viewport + ?Sized>(viewport: &V) -> ScrollState {
        ScrollState::from_viewport(viewport)
    }

    /// Apply after the rebuild completed; rebuilding resets the offset.
    pub fn restore<V: Viewport + ?Sized>(viewport: &mut V, state: &ScrollState) {
        viewport.set_scroll_offset(state.position);
    }
}

/// Scrollable area over a table's rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollRegion {
    offset: f32,
    viewport_height: f32,
    content_height: f32,
}

impl ScrollRegion {
    pub fn new(viewport_height: f32) -> Self {
        Self {
            offset: 0.0,
            viewport_height: viewport_height.max(0.0),
            content_height: 0.0,
        }
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// New content scrolls back to the top.
    pub fn set_content_height(&mut self, height: f32) {
        self.content_height = height.max(0.0);
        self.offset = 0.0;
    }

    pub fn max_offset(&self) -> f32 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    /// Rows (of uniform `row_height`) at least partly visible.
    pub fn visible_rows(&self, row_height: f32, row_count: usize) -> std::ops::Range<usize> {
        if row_height <= 0.0 || row_count == 0 {
            return 0..0;
        }
        let first = (self.offset / row_height).floor() as usize;
        let last = ((self.offset + self.viewport_height) / row_height).ceil() as usize;
        first.min(row_count)..last.min(row_count)
    }
}

impl Viewport for ScrollRegion {
    fn scroll_offset(&self) -> f32 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: f32) {
        self.offset = offset.clamp(0.0, self.max_offset());
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }
}
