// src/report.rs - Printable analysis report assembly
//
// Builds a report model from an ordered list of processing results, per-file
// enrichment included, and renders it as a printable HTML document. Every
// input result produces exactly one section, in input order.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::analytics::{self, TemporalAnalytics};
use crate::api_client::ApiClient;
use crate::brands;
use crate::error::Result;
use crate::media::{format_confidence, format_seconds};
use crate::models::{
    DetectionRecord, DetectionsResponse, Logo, MediaKind, PredictionRecord, PredictionsResponse,
    ProcessingResult,
};

/// Per-file data the enrichment step fetches. A seam so degradation on a
/// failed fetch is testable without a live backend.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn detections(&self, file_id: i64) -> Result<DetectionsResponse>;
    async fn predictions(&self, file_id: i64) -> Result<PredictionsResponse>;
}

#[async_trait]
impl ResultSource for ApiClient {
    async fn detections(&self, file_id: i64) -> Result<DetectionsResponse> {
        ApiClient::detections(self, file_id).await
    }

    async fn predictions(&self, file_id: i64) -> Result<PredictionsResponse> {
        ApiClient::predictions(self, file_id).await
    }
}

/// Display metadata the results themselves don't carry, keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct FileMeta {
    pub name: Option<String>,
    pub kind: Option<MediaKind>,
}

#[derive(Debug, Clone)]
pub struct ReportSection {
    pub file_number: usize,
    pub file_id: i64,
    pub session_id: String,
    pub file_name: String,
    pub file_type: MediaKind,
    pub detections_count: u32,
    /// Detected brands that pass the logo selection; these are rendered.
    pub brands: Vec<String>,
    /// The file's full detected-brand list, needed to resolve detection
    /// rows that carry only a positional brand id.
    pub detected_brands: Vec<String>,
    pub duration_seconds: Option<f64>,
    pub predictions: Vec<PredictionRecord>,
    pub detections: Vec<DetectionRecord>,
    pub temporal: Option<TemporalAnalytics>,
}

#[derive(Debug, Clone)]
pub struct ReportData {
    pub total_files: usize,
    pub total_detections: u32,
    pub total_brands: usize,
    pub sections: Vec<ReportSection>,
    pub generated_at: DateTime<Utc>,
}

/// Assemble the report model from results in input order. The logo
/// selection narrows every brand list; an empty selection keeps everything.
pub fn build_report_data(
    results: &[ProcessingResult],
    meta: &HashMap<String, FileMeta>,
    selected_logos: &[Logo],
) -> ReportData {
    let total_detections = results.iter().map(|r| r.detections_count).sum();

    let all_brands: BTreeSet<&String> = results
        .iter()
        .flat_map(|r| brands::filter_brands(selected_logos, &r.brands_detected))
        .collect();

    let sections = results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let file_meta = meta.get(&result.session_id).cloned().unwrap_or_default();
            let file_type = file_meta.kind.unwrap_or_else(|| {
                if result.image_url.is_some() && result.video_url.is_none() {
                    MediaKind::Image
                } else {
                    MediaKind::Video
                }
            });
            ReportSection {
                file_number: index + 1,
                file_id: result.file_id,
                session_id: result.session_id.clone(),
                file_name: file_meta
                    .name
                    .unwrap_or_else(|| format!("File {}", index + 1)),
                file_type,
                detections_count: result.detections_count,
                brands: brands::filter_brands(selected_logos, &result.brands_detected)
                    .into_iter()
                    .cloned()
                    .collect(),
                detected_brands: result.brands_detected.clone(),
                duration_seconds: None,
                predictions: Vec::new(),
                detections: Vec::new(),
                temporal: None,
            }
        })
        .collect();

    ReportData {
        total_files: results.len(),
        total_detections,
        total_brands: all_brands.len(),
        sections,
        generated_at: Utc::now(),
    }
}

/// Fetch detections and predictions for every section, keeping only rows
/// whose brand passes the logo selection. A failed fetch for one file
/// degrades that file's section to the data already present and never
/// aborts the report.
pub async fn enrich<S: ResultSource>(
    source: &S,
    data: &mut ReportData,
    selected_logos: &[Logo],
) {
    for section in &mut data.sections {
        let mut fps = None;

        match source.predictions(section.file_id).await {
            Ok(response) => {
                fps = response.fps;
                section.duration_seconds = response.duration_seconds;
                section.predictions =
                    brands::filter_predictions(selected_logos, &response.predictions)
                        .into_iter()
                        .cloned()
                        .collect();
            }
            Err(e) => {
                warn!(
                    "Predictions unavailable for file {}, section falls back: {}",
                    section.file_id, e
                );
            }
        }

        match source.detections(section.file_id).await {
            Ok(response) => {
                section.detections = brands::filter_detections(
                    selected_logos,
                    &response.detections,
                    &section.detected_brands,
                )
                .into_iter()
                .cloned()
                .collect();
            }
            Err(e) => {
                warn!(
                    "Detections unavailable for file {}, section falls back: {}",
                    section.file_id, e
                );
            }
        }

        if section.file_type == MediaKind::Video && !section.detections.is_empty() {
            section.temporal = Some(analytics::analyze(
                &section.detections,
                &section.detected_brands,
                fps,
                section.duration_seconds,
            ));
        }
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn brand_table(predictions: &[PredictionRecord]) -> String {
    let mut rows = String::new();
    for prediction in predictions {
        let avg = prediction
            .avg_score
            .map(format_confidence)
            .unwrap_or_else(|| "N/A".to_string());
        let max = prediction
            .max_score
            .map(format_confidence)
            .unwrap_or_else(|| "N/A".to_string());
        let duration = prediction
            .visible_seconds()
            .map(format_seconds)
            .unwrap_or_else(|| "N/A".to_string());
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(prediction.brand_name()),
            prediction.total_detections.unwrap_or(0),
            avg,
            max,
            duration
        ));
    }
    format!(
        "<h4>Brand Performance Analysis</h4>\n<table class=\"brand-stats\">\n\
         <tr><th>Brand</th><th>Detections</th><th>Avg Score</th><th>Max Score</th><th>Duration</th></tr>\n\
         {}</table>\n",
        rows
    )
}

fn temporal_table(temporal: &TemporalAnalytics) -> String {
    let mut rows = String::new();
    for bucket in &temporal.buckets {
        if bucket.counts.is_empty() {
            continue;
        }
        let mut brands: Vec<(&String, &usize)> = bucket.counts.iter().collect();
        brands.sort_by(|a, b| a.0.cmp(b.0));
        for (brand, count) in brands {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&bucket.label),
                escape_html(brand),
                count
            ));
        }
    }
    format!(
        "<h4>Temporal Analytics</h4>\n<table class=\"temporal\">\n\
         <tr><th>Time</th><th>Brand</th><th>Detections</th></tr>\n{}</table>\n",
        rows
    )
}

fn file_section(section: &ReportSection) -> String {
    let brands = if section.brands.is_empty() {
        "None".to_string()
    } else {
        escape_html(&section.brands.join(", "))
    };
    let duration = section
        .duration_seconds
        .map(|d| format!("<li>Duration: {}</li>", format_seconds(d)))
        .unwrap_or_default();

    let mut body = format!(
        "<section class=\"file-section\">\n\
         <h3>File {}: {}</h3>\n\
         <ul>\n\
         <li>File ID: {}</li>\n\
         <li>Type: {}</li>\n\
         <li>Detections: {}</li>\n\
         {}\
         <li>Brands: {}</li>\n\
         </ul>\n",
        section.file_number,
        escape_html(&section.file_name),
        section.file_id,
        section.file_type.to_string().to_uppercase(),
        section.detections_count,
        duration,
        brands
    );

    if !section.predictions.is_empty() {
        body.push_str(&brand_table(&section.predictions));
    }
    if let Some(temporal) = &section.temporal {
        body.push_str(&temporal_table(temporal));
    }
    body.push_str("</section>\n");
    body
}

/// Render the report to a self-contained printable HTML document.
pub fn render_html(data: &ReportData) -> String {
    let sections: String = data.sections.iter().map(file_section).collect();
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Logo Detection Analysis Report</title>\n\
         <style>\n\
         body {{ font-family: Helvetica, Arial, sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; margin: 1em 0; }}\n\
         th, td {{ border: 1px solid #999; padding: 4px 10px; text-align: left; }}\n\
         .file-section {{ page-break-inside: avoid; margin-bottom: 2em; }}\n\
         @media print {{ .file-section {{ page-break-after: auto; }} }}\n\
         </style>\n</head>\n<body>\n\
         <h1>Logo Detection Analysis Report</h1>\n\
         <p class=\"generated\">Generated: {}</p>\n\
         <h2>Summary</h2>\n\
         <ul class=\"summary\">\n\
         <li>Total Files Processed: {}</li>\n\
         <li>Total Detections: {}</li>\n\
         <li>Total Brands Detected: {}</li>\n\
         </ul>\n\
         {}\
         </body>\n</html>\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        data.total_files,
        data.total_detections,
        data.total_brands,
        sections
    )
}

/// Dated artifact name, e.g. `logo-detection-report-2026-08-27.html`.
pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("logo-detection-report-{}.html", generated_at.format("%Y-%m-%d"))
}

/// Render and save the report next to `out_dir`, returning the written path.
pub fn save_report(data: &ReportData, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(report_file_name(data.generated_at));
    std::fs::write(&path, render_html(data))?;
    info!("Report written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(session: &str, file_id: i64, count: u32, brands: &[&str]) -> ProcessingResult {
        ProcessingResult {
            file_id,
            session_id: session.to_string(),
            detections_count: count,
            brands_detected: brands.iter().map(|b| b.to_string()).collect(),
            statistics: None,
            video_url: Some(format!("http://localhost:8001/media/{}.mp4", file_id)),
            image_url: None,
            detections: None,
        }
    }

    #[test]
    fn one_section_per_result_in_input_order() {
        let results = vec![
            result("s-1", 1, 3, &["F5"]),
            result("s-2", 2, 2, &["Microsoft"]),
            result("s-3", 3, 0, &[]),
        ];
        let data = build_report_data(&results, &HashMap::new(), &[]);
        assert_eq!(data.total_files, 3);
        assert_eq!(data.sections.len(), 3);
        assert_eq!(data.sections[0].session_id, "s-1");
        assert_eq!(data.sections[1].session_id, "s-2");
        assert_eq!(data.sections[2].session_id, "s-3");
        assert_eq!(data.sections[1].file_number, 2);
    }

    #[test]
    fn summary_totals_sum_per_file_counts() {
        let results = vec![
            result("s-1", 1, 3, &["F5"]),
            result("s-2", 2, 2, &["Microsoft", "F5"]),
        ];
        let data = build_report_data(&results, &HashMap::new(), &[]);
        assert_eq!(data.total_detections, 5);
        // Unique brands across files.
        assert_eq!(data.total_brands, 2);
    }

    #[test]
    fn meta_supplies_name_and_kind() {
        let results = vec![result("s-1", 1, 1, &["F5"])];
        let mut meta = HashMap::new();
        meta.insert(
            "s-1".to_string(),
            FileMeta {
                name: Some("match.mp4".to_string()),
                kind: Some(MediaKind::Video),
            },
        );
        let data = build_report_data(&results, &meta, &[]);
        assert_eq!(data.sections[0].file_name, "match.mp4");
        assert_eq!(data.sections[0].file_type, MediaKind::Video);
    }

    #[test]
    fn missing_meta_falls_back_to_numbered_name() {
        let mut image = result("s-1", 1, 1, &["F5"]);
        image.video_url = None;
        image.image_url = Some("http://x/1.png".to_string());
        let data = build_report_data(&[image], &HashMap::new(), &[]);
        assert_eq!(data.sections[0].file_name, "File 1");
        assert_eq!(data.sections[0].file_type, MediaKind::Image);
    }

    #[test]
    fn html_contains_every_section_in_order() {
        let results = vec![
            result("s-1", 1, 3, &["F5"]),
            result("s-2", 2, 2, &["Microsoft"]),
        ];
        let data = build_report_data(&results, &HashMap::new(), &[]);
        let html = render_html(&data);
        let first = html.find("File 1:").unwrap();
        let second = html.find("File 2:").unwrap();
        assert!(first < second);
        assert!(html.contains("Total Detections: 5"));
        assert!(html.contains("Microsoft"));
    }

    #[test]
    fn brand_names_are_escaped() {
        let results = vec![result("s-1", 1, 1, &["<script>"])];
        let data = build_report_data(&results, &HashMap::new(), &[]);
        let html = render_html(&data);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn report_name_carries_iso_date() {
        let at = DateTime::parse_from_rfc3339("2026-08-27T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(report_file_name(at), "logo-detection-report-2026-08-27.html");
    }

    fn selected(names: &[&str]) -> Vec<Logo> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Logo {
                id: i as u32 + 1,
                name: (*name).to_string(),
                selected: true,
                icon: None,
                image_url: None,
            })
            .collect()
    }

    fn prediction(brand: &str, total: u32) -> PredictionRecord {
        PredictionRecord {
            id: 1,
            video_id: None,
            brand_id: None,
            brands: Some(crate::models::BrandRef {
                name: brand.to_string(),
            }),
            total_detections: Some(total),
            avg_score: Some(0.8),
            max_score: Some(0.9),
            min_score: None,
            duration_seconds: Some(2.0),
            total_seconds: None,
            first_detection_time: None,
            last_detection_time: None,
        }
    }

    fn detection(brand: &str, frame: u32) -> DetectionRecord {
        DetectionRecord {
            id: frame as i64,
            file_id: 1,
            brand_id: None,
            brand_name: Some(brand.to_string()),
            brands: None,
            score: 0.8,
            bbox: [0.0, 0.0, 10.0, 10.0],
            t_start: None,
            t_end: None,
            frame: Some(frame),
            frame_capture_url: None,
            frame_number: None,
        }
    }

    /// Answers per-file fetches from fixed tables; unknown file ids fail.
    struct ScriptedReports {
        predictions: HashMap<i64, Vec<PredictionRecord>>,
        detections: HashMap<i64, Vec<DetectionRecord>>,
    }

    #[async_trait]
    impl ResultSource for ScriptedReports {
        async fn detections(&self, file_id: i64) -> Result<DetectionsResponse> {
            self.detections
                .get(&file_id)
                .map(|rows| DetectionsResponse {
                    detections: rows.clone(),
                })
                .ok_or_else(|| crate::error::ClientError::Config("no such file".to_string()))
        }

        async fn predictions(&self, file_id: i64) -> Result<PredictionsResponse> {
            self.predictions
                .get(&file_id)
                .map(|rows| PredictionsResponse {
                    predictions: rows.clone(),
                    fps: Some(30.0),
                    duration_seconds: Some(10.0),
                })
                .ok_or_else(|| crate::error::ClientError::Config("no such file".to_string()))
        }
    }

    #[test]
    fn selection_narrows_section_brand_lists() {
        let results = vec![result("s-1", 1, 3, &["Factoria", "Microsoft"])];
        let logos = selected(&["Factoria F5"]);
        let data = build_report_data(&results, &HashMap::new(), &logos);
        assert_eq!(data.sections[0].brands, vec!["Factoria".to_string()]);
        // The raw list stays available for brand-id resolution.
        assert_eq!(data.sections[0].detected_brands.len(), 2);
        assert_eq!(data.total_brands, 1);
    }

    #[tokio::test]
    async fn enrichment_respects_logo_selection() {
        let results = vec![result("s-1", 1, 2, &["F5", "Microsoft"])];
        let logos = selected(&["Microsoft"]);
        let mut data = build_report_data(&results, &HashMap::new(), &logos);

        let source = ScriptedReports {
            predictions: HashMap::from([(
                1,
                vec![prediction("F5", 1), prediction("Microsoft", 1)],
            )]),
            detections: HashMap::from([(
                1,
                vec![detection("F5", 30), detection("Microsoft", 60)],
            )]),
        };
        enrich(&source, &mut data, &logos).await;

        let section = &data.sections[0];
        assert_eq!(section.predictions.len(), 1);
        assert_eq!(section.predictions[0].brand_name(), "Microsoft");
        assert_eq!(section.detections.len(), 1);
        assert_eq!(section.detections[0].brand_name.as_deref(), Some("Microsoft"));
        let temporal = section.temporal.as_ref().unwrap();
        assert!(temporal.timelines.contains_key("Microsoft"));
        assert!(!temporal.timelines.contains_key("F5"));
    }

    #[tokio::test]
    async fn one_failed_enrichment_leaves_other_sections_intact() {
        let results = vec![
            result("s-1", 1, 1, &["F5"]),
            result("s-2", 2, 1, &["Microsoft"]),
        ];
        let mut data = build_report_data(&results, &HashMap::new(), &[]);

        // Only file 2 is known to the source; file 1's fetches fail.
        let source = ScriptedReports {
            predictions: HashMap::from([(2, vec![prediction("Microsoft", 1)])]),
            detections: HashMap::from([(2, vec![detection("Microsoft", 30)])]),
        };
        enrich(&source, &mut data, &[]).await;

        let degraded = &data.sections[0];
        assert!(degraded.predictions.is_empty());
        assert!(degraded.detections.is_empty());
        assert!(degraded.duration_seconds.is_none());
        // The section itself survives with the data it already had.
        assert_eq!(degraded.detections_count, 1);
        assert_eq!(degraded.brands, vec!["F5".to_string()]);

        let intact = &data.sections[1];
        assert_eq!(intact.predictions.len(), 1);
        assert_eq!(intact.detections.len(), 1);
        assert_eq!(intact.duration_seconds, Some(10.0));
        assert!(intact.temporal.is_some());
    }

    #[test]
    fn save_report_writes_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_report_data(&[result("s-1", 1, 1, &["F5"])], &HashMap::new(), &[]);
        let path = save_report(&data, dir.path()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Logo Detection Analysis Report"));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("logo-detection-report-"));
    }
}
