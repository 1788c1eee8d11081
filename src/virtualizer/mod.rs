//! Row virtualization for large tabular result sets
//!
//! Given a row count, a fixed row height and a scroll position, compute
//! the minimal contiguous window of rows that must be materialized to
//! cover the viewport plus overscan. The computation is pure: it is
//! re-derived from scratch on every scroll or data change, never
//! patched incrementally, so there is no state to drift.
//!
//! Positioning invariant for the fixed-height case: row `i` sits at
//! pixel offset `i * row_height`, and the scrollable area is always
//! `row_count * row_height` tall no matter how few rows are rendered.

/// Virtualization parameters.
#[derive(Debug, Clone, Copy)]
pub struct VirtualizerConfig {
    /// Fixed pixel height of every row
    pub row_height: u32,
    /// Pixel height of the scroll viewport
    pub viewport_height: u32,
    /// Rows rendered beyond each visible boundary to reduce pop-in
    /// during fast scroll
    pub overscan: usize,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            row_height: 44,
            viewport_height: 600,
            overscan: 8,
        }
    }
}

/// One materialized row: its logical index and absolute pixel offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    pub offset_px: u64,
}

/// The derived window: visible and rendered index ranges plus total
/// scrollable height. Ranges are inclusive and `None` when there are no
/// rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualWindow {
    row_height: u32,
    row_count: usize,
    visible: Option<(usize, usize)>,
    rendered: Option<(usize, usize)>,
    total_height: u64,
}

impl VirtualWindow {
    /// Derive the window for `row_count` rows at `scroll_offset` pixels.
    pub fn compute(config: &VirtualizerConfig, row_count: usize, scroll_offset: u64) -> Self {
        let row_height = config.row_height.max(1);
        if row_count == 0 {
            return Self {
                row_height,
                row_count: 0,
                visible: None,
                rendered: None,
                total_height: 0,
            };
        }

        let total_height = row_count as u64 * row_height as u64;
        let scroll = scroll_offset.min(total_height - 1);
        let first_visible = (scroll / row_height as u64) as usize;
        let last_visible = (((scroll + config.viewport_height as u64).saturating_sub(1))
            / row_height as u64) as usize;
        let last_visible = last_visible.min(row_count - 1);

        let render_start = first_visible.saturating_sub(config.overscan);
        let render_end = last_visible.saturating_add(config.overscan).min(row_count - 1);

        Self {
            row_height,
            row_count,
            visible: Some((first_visible, last_visible)),
            rendered: Some((render_start, render_end)),
            total_height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_none()
    }

    /// Total scrollable height in pixels, independent of how many rows
    /// are materialized.
    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    /// Inclusive index range of rows intersecting the viewport.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        self.visible
    }

    /// Inclusive index range of rows to materialize (visible plus
    /// overscan, clamped to the data).
    pub fn rendered_range(&self) -> Option<(usize, usize)> {
        self.rendered
    }

    /// Absolute pixel offset of a row.
    pub fn offset_of(&self, index: usize) -> u64 {
        index as u64 * self.row_height as u64
    }

    /// Materialized rows in order, each with its absolute offset.
    pub fn items(&self) -> impl Iterator<Item = VirtualItem> + '_ {
        let (start, end) = match self.rendered {
            Some(range) => range,
            None => (1, 0), // empty iterator
        };
        (start..=end.min(self.row_count.saturating_sub(1))).map(move |index| VirtualItem {
            index,
            offset_px: self.offset_of(index),
        })
    }
}

/// A materialized row bound to its backing data and stable identity.
///
/// The key comes from the caller's row-identity function, never from the
/// array index: indexes shift whenever a page of data reloads, ids do
/// not.
#[derive(Debug)]
pub struct RenderedRow<'a, T, K> {
    pub index: usize,
    pub key: K,
    pub offset_px: u64,
    pub row: &'a T,
}

/// Bind the window to actual row data, forwarding each row's stable
/// identifier for click and selection handling.
pub fn rendered_rows<'a, T, K>(
    window: &VirtualWindow,
    rows: &'a [T],
    identity: impl Fn(&T) -> K,
) -> Vec<RenderedRow<'a, T, K>> {
    let Some((start, end)) = window.rendered_range() else {
        return Vec::new();
    };
    let end = end.min(rows.len().saturating_sub(1));
    if rows.is_empty() || start > end {
        return Vec::new();
    }
    rows[start..=end]
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let index = start + i;
            RenderedRow {
                index,
                key: identity(row),
                offset_px: window.offset_of(index),
                row,
            }
        })
        .collect()
}
