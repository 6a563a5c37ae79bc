// src/overlay.rs - Bounding-box projection onto a contain-fit display surface
//
// Backend boxes are absolute pixels in the original media resolution. The
// display surface letterboxes or pillarboxes the media like CSS
// `object-fit: contain`, so every corner has to be rescaled and offset.

/// Pixel dimensions of a medium or a display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Where the media actually lands inside the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedMedia {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A projected rectangle in container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle as percentages of the media's own dimensions, used for
/// overlays positioned relative to a video element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Compute the displayed size and centering offsets of media fitted into a
/// container while preserving aspect ratio.
pub fn contain_fit(media: Dimensions, container: Dimensions) -> DisplayedMedia {
    let ar_media = media.aspect_ratio();
    let ar_container = container.aspect_ratio();

    if ar_media > ar_container {
        // Media is wider: fill container width, letterbox vertically.
        let width = container.width;
        let height = container.width / ar_media;
        DisplayedMedia {
            width,
            height,
            offset_x: 0.0,
            offset_y: (container.height - height) / 2.0,
        }
    } else {
        // Media is taller (or equal): fill container height, pillarbox.
        let height = container.height;
        let width = container.height * ar_media;
        DisplayedMedia {
            width,
            height,
            offset_x: (container.width - width) / 2.0,
            offset_y: 0.0,
        }
    }
}

/// Project a bounding box `[left, top, right, bottom]` in original-media
/// pixels onto the container. Boxes outside `[0,W]x[0,H]` are projected
/// as-is, not clipped; partial overlays are accepted.
pub fn project_bbox(bbox: [f64; 4], media: Dimensions, container: Dimensions) -> OverlayRect {
    let displayed = contain_fit(media, container);
    let [left, top, right, bottom] = bbox;

    OverlayRect {
        left: (left / media.width) * displayed.width + displayed.offset_x,
        top: (top / media.height) * displayed.height + displayed.offset_y,
        width: ((right - left) / media.width) * displayed.width,
        height: ((bottom - top) / media.height) * displayed.height,
    }
}

/// Express a bounding box as percentages of the media's own dimensions.
pub fn bbox_as_percentages(bbox: [f64; 4], media: Dimensions) -> PercentRect {
    let [left, top, right, bottom] = bbox;
    PercentRect {
        left: (left / media.width) * 100.0,
        top: (top / media.height) * 100.0,
        width: ((right - left) / media.width) * 100.0,
        height: ((bottom - top) / media.height) * 100.0,
    }
}

/// Whether a video detection with an optional time window is visible at the
/// given playback time. Detections without a window are never shown.
pub fn visible_at(t_start: Option<f64>, t_end: Option<f64>, current_time: f64) -> bool {
    match (t_start, t_end) {
        (Some(start), Some(end)) => current_time >= start && current_time <= end,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn equal_aspect_ratios_scale_without_offset() {
        let media = Dimensions::new(1920.0, 1080.0);
        let container = Dimensions::new(960.0, 540.0);
        let rect = project_bbox([192.0, 108.0, 384.0, 216.0], media, container);
        // (box / mediaSize) * containerSize, zero offset
        approx(rect.left, 96.0);
        approx(rect.top, 54.0);
        approx(rect.width, 96.0);
        approx(rect.height, 54.0);
    }

    #[test]
    fn wide_media_is_letterboxed() {
        // 16:9 media in a square container fills the width.
        let media = Dimensions::new(1920.0, 1080.0);
        let container = Dimensions::new(400.0, 400.0);
        let fit = contain_fit(media, container);
        approx(fit.width, 400.0);
        approx(fit.height, 225.0);
        approx(fit.offset_x, 0.0);
        approx(fit.offset_y, 87.5);
    }

    #[test]
    fn tall_media_is_pillarboxed() {
        let media = Dimensions::new(1080.0, 1920.0);
        let container = Dimensions::new(400.0, 400.0);
        let fit = contain_fit(media, container);
        approx(fit.height, 400.0);
        approx(fit.width, 225.0);
        approx(fit.offset_y, 0.0);
        approx(fit.offset_x, 87.5);
    }

    #[test]
    fn letterbox_offset_shifts_projected_boxes() {
        let media = Dimensions::new(1920.0, 1080.0);
        let container = Dimensions::new(400.0, 400.0);
        // Box at the media origin lands at the top of the letterboxed area.
        let rect = project_bbox([0.0, 0.0, 1920.0, 1080.0], media, container);
        approx(rect.left, 0.0);
        approx(rect.top, 87.5);
        approx(rect.width, 400.0);
        approx(rect.height, 225.0);
    }

    #[test]
    fn out_of_range_boxes_are_not_clipped() {
        let media = Dimensions::new(100.0, 100.0);
        let container = Dimensions::new(100.0, 100.0);
        let rect = project_bbox([-10.0, -10.0, 120.0, 120.0], media, container);
        approx(rect.left, -10.0);
        approx(rect.top, -10.0);
        approx(rect.width, 130.0);
        approx(rect.height, 130.0);
    }

    #[test]
    fn percentage_projection() {
        let media = Dimensions::new(1920.0, 1080.0);
        let rect = bbox_as_percentages([192.0, 216.0, 384.0, 432.0], media);
        approx(rect.left, 10.0);
        approx(rect.top, 20.0);
        approx(rect.width, 10.0);
        approx(rect.height, 20.0);
    }

    #[test]
    fn time_window_visibility() {
        assert!(visible_at(Some(1.0), Some(3.0), 2.0));
        assert!(visible_at(Some(1.0), Some(3.0), 1.0));
        assert!(visible_at(Some(1.0), Some(3.0), 3.0));
        assert!(!visible_at(Some(1.0), Some(3.0), 3.01));
        assert!(!visible_at(None, Some(3.0), 2.0));
        assert!(!visible_at(Some(1.0), None, 2.0));
    }
}
