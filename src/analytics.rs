// src/analytics.rs - Temporal aggregation of detection records
//
// Derives per-brand timelines, on-screen durations, detection frequencies,
// peak frames and fixed-interval intensity buckets from the raw detection
// rows of one file. Chart rendering is out of scope; these aggregates feed
// the report tables and the CLI summary.

use std::collections::HashMap;

use crate::models::DetectionRecord;

/// Assumed frame rate when the backend reports none.
pub const DEFAULT_FPS: f64 = 30.0;

/// Number of buckets in the detection-intensity timeline.
pub const TIMELINE_INTERVALS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePoint {
    pub frame: u32,
    pub timestamp: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakFrame {
    pub frame: u32,
    pub count: usize,
}

/// One fixed-width slice of the timeline with per-brand detection counts.
#[derive(Debug, Clone)]
pub struct IntervalBucket {
    pub label: String,
    pub start_seconds: f64,
    pub counts: HashMap<String, usize>,
}

impl IntervalBucket {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemporalAnalytics {
    /// Detections per brand ordered by timestamp.
    pub timelines: HashMap<String, Vec<TimelinePoint>>,
    /// Seconds between a brand's first and last sighting.
    pub durations: HashMap<String, f64>,
    /// Detections per second of covered footage.
    pub frequencies: HashMap<String, f64>,
    /// The five frames with the most simultaneous detections.
    pub peak_frames: Vec<PeakFrame>,
    pub buckets: Vec<IntervalBucket>,
}

fn minute_label(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, secs)
}

/// Aggregate the detections of one file. `video_duration` (seconds) bounds
/// the frequency calculation when known; otherwise the last detection's
/// timestamp is used. Detections without a frame index are skipped.
pub fn analyze(
    detections: &[DetectionRecord],
    brands_detected: &[String],
    fps: Option<f64>,
    video_duration: Option<f64>,
) -> TemporalAnalytics {
    let fps = fps.filter(|f| *f > 0.0).unwrap_or(DEFAULT_FPS);
    let frame_to_seconds = |frame: u32| frame as f64 / fps;

    let mut timelines: HashMap<String, Vec<TimelinePoint>> = HashMap::new();
    for detection in detections {
        let Some(frame) = detection.frame.or(detection.frame_number) else {
            continue;
        };
        let brand = detection
            .resolve_brand(brands_detected)
            .unwrap_or("Unknown")
            .to_string();
        timelines.entry(brand).or_default().push(TimelinePoint {
            frame,
            timestamp: frame_to_seconds(frame),
            score: detection.score,
        });
    }

    for points in timelines.values_mut() {
        points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }

    let mut durations = HashMap::new();
    for (brand, points) in &timelines {
        let duration = if points.len() > 1 {
            points[points.len() - 1].timestamp - points[0].timestamp
        } else {
            0.0
        };
        durations.insert(brand.clone(), duration);
    }

    let max_time = timelines
        .values()
        .flat_map(|points| points.iter().map(|p| p.timestamp))
        .fold(0.0_f64, f64::max);

    let time_span = match video_duration {
        Some(d) if d > 0.0 => d,
        _ => max_time,
    };

    let mut frequencies = HashMap::new();
    if time_span > 0.0 {
        for (brand, points) in &timelines {
            frequencies.insert(brand.clone(), points.len() as f64 / time_span);
        }
    }

    let mut frame_counts: HashMap<u32, usize> = HashMap::new();
    for points in timelines.values() {
        for point in points {
            *frame_counts.entry(point.frame).or_insert(0) += 1;
        }
    }
    let mut peak_frames: Vec<PeakFrame> = frame_counts
        .into_iter()
        .map(|(frame, count)| PeakFrame { frame, count })
        .collect();
    peak_frames.sort_by(|a, b| b.count.cmp(&a.count).then(a.frame.cmp(&b.frame)));
    peak_frames.truncate(5);

    let mut buckets = Vec::new();
    if max_time > 0.0 {
        let interval = max_time / TIMELINE_INTERVALS as f64;
        // Assign each point a bucket index directly so every detection lands
        // in exactly one bucket; the last bucket absorbs the final timestamp.
        let mut per_bucket: Vec<HashMap<String, usize>> =
            vec![HashMap::new(); TIMELINE_INTERVALS];
        for (brand, points) in &timelines {
            for point in points {
                let index = ((point.timestamp / interval).floor() as usize)
                    .min(TIMELINE_INTERVALS - 1);
                *per_bucket[index].entry(brand.clone()).or_insert(0) += 1;
            }
        }
        for (i, counts) in per_bucket.into_iter().enumerate() {
            let start = i as f64 * interval;
            buckets.push(IntervalBucket {
                label: minute_label(start),
                start_seconds: start,
                counts,
            });
        }
    }

    TemporalAnalytics {
        timelines,
        durations,
        frequencies,
        peak_frames,
        buckets,
    }
}

/// Group detections by resolved brand name; used by the CLI summary and the
/// report's detection summary.
pub fn detections_by_brand<'a>(
    detections: &'a [DetectionRecord],
    brands_detected: &[String],
) -> HashMap<String, Vec<&'a DetectionRecord>> {
    let mut grouped: HashMap<String, Vec<&DetectionRecord>> = HashMap::new();
    for detection in detections {
        let brand = detection
            .resolve_brand(brands_detected)
            .unwrap_or("Unknown")
            .to_string();
        grouped.entry(brand).or_default().push(detection);
    }
    grouped
}
