// src/brands.rs - Logo catalog and brand-name matching
//
// The matcher is the single source of truth for "is this detected brand
// selected": the brand list, detection filtering, frame-capture filtering
// and the statistics table all go through `is_brand_selected`.

use std::collections::HashMap;

use crate::models::{BrandStats, DetectionRecord, Logo, PredictionRecord};

/// The fixed catalog the selection step offers.
pub fn logo_catalog() -> Vec<Logo> {
    let entries: [(u32, &str, &str); 6] = [
        (1, "F5", "🚀"),
        (2, "Factoria F5", "🏭"),
        (3, "SomosF5", "⭐"),
        (4, "FemCoders", "👩‍💻"),
        (5, "Fundacion Orange", "🍊"),
        (6, "Microsoft", "🪟"),
    ];
    entries
        .iter()
        .map(|(id, name, icon)| Logo {
            id: *id,
            name: (*name).to_string(),
            selected: false,
            icon: Some((*icon).to_string()),
            image_url: None,
        })
        .collect()
}

fn first_word(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or("")
}

fn strip_non_alphanumeric(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Match one selected logo name against one detected brand name.
///
/// Case-insensitive and trimmed. A longer name containing the shorter one
/// only matches when its first whitespace-delimited word equals the shorter
/// name exactly, so "Factoria F5" matches "Factoria" but "FemCoders" never
/// matches "F5". As a last resort both names are compared with all
/// non-alphanumeric characters stripped.
pub fn names_match(selected: &str, detected: &str) -> bool {
    let selected = selected.trim().to_lowercase();
    let detected = detected.trim().to_lowercase();

    if selected == detected {
        return true;
    }

    if selected.len() > detected.len() && selected.contains(&detected) {
        if first_word(&selected) == detected {
            return true;
        }
    }

    if detected.len() > selected.len() && detected.contains(&selected) {
        if first_word(&detected) == selected {
            return true;
        }
    }

    strip_non_alphanumeric(&selected) == strip_non_alphanumeric(&detected)
}

/// Decide whether a detected brand counts as selected. An empty selection
/// is permissive: every detected brand is considered selected.
pub fn is_brand_selected(selected_logos: &[Logo], detected: &str) -> bool {
    let active: Vec<&Logo> = selected_logos.iter().filter(|l| l.selected).collect();
    if active.is_empty() {
        return true;
    }
    active.iter().any(|logo| names_match(&logo.name, detected))
}

/// Filter a detected-brand list down to the selected ones.
pub fn filter_brands<'a>(selected_logos: &[Logo], brands: &'a [String]) -> Vec<&'a String> {
    brands
        .iter()
        .filter(|brand| is_brand_selected(selected_logos, brand))
        .collect()
}

/// Filter detection records by selection, resolving each record's brand with
/// the same fallback chain the results view uses.
pub fn filter_detections<'a>(
    selected_logos: &[Logo],
    detections: &'a [DetectionRecord],
    brands_detected: &[String],
) -> Vec<&'a DetectionRecord> {
    detections
        .iter()
        .filter(|d| {
            let brand = d.resolve_brand(brands_detected).unwrap_or("");
            is_brand_selected(selected_logos, brand)
        })
        .collect()
}

/// Filter prediction rows by selection.
pub fn filter_predictions<'a>(
    selected_logos: &[Logo],
    predictions: &'a [PredictionRecord],
) -> Vec<&'a PredictionRecord> {
    predictions
        .iter()
        .filter(|p| is_brand_selected(selected_logos, p.brand_name()))
        .collect()
}

/// Filter a per-brand statistics map by selection.
pub fn filter_statistics<'a>(
    selected_logos: &[Logo],
    statistics: &'a HashMap<String, BrandStats>,
) -> HashMap<&'a str, &'a BrandStats> {
    statistics
        .iter()
        .filter(|(brand, _)| is_brand_selected(selected_logos, brand))
        .map(|(brand, stats)| (brand.as_str(), stats))
        .collect()
}

/// Toggle one catalog entry by name, in place.
pub fn toggle_brand(logos: &mut [Logo], brand_name: &str) {
    for logo in logos.iter_mut() {
        if names_match(&logo.name, brand_name) {
            logo.selected = !logo.selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn exact_match_is_case_insensitive() {
        assert!(names_match("Microsoft", "MICROSOFT"));
        assert!(names_match("  f5 ", "F5"));
    }

    #[test]
    fn longer_selected_matches_on_first_word_only() {
        assert!(names_match("Factoria F5", "Factoria"));
        // "F5" is contained in "Factoria F5" but is not its first word.
        assert!(!names_match("Factoria F5", "F5"));
    }

    #[test]
    fn longer_detected_matches_symmetrically() {
        assert!(names_match("Factoria", "Factoria F5"));
        assert!(!names_match("F5", "Factoria F5"));
    }

    #[test]
    fn unrelated_substring_is_rejected() {
        assert!(!names_match("F5", "FemCoders"));
        assert!(!names_match("FemCoders", "F5"));
    }

    #[test]
    fn normalized_fallback_ignores_punctuation() {
        assert!(names_match("SomosF5", "Somos F5"));
        assert!(names_match("Fundacion Orange", "fundacion-orange"));
    }

    #[test]
    fn empty_selection_is_permissive() {
        let logos = logo_catalog(); // nothing selected
        assert!(is_brand_selected(&logos, "Anything"));
        assert!(is_brand_selected(&[], "Anything"));
    }

    #[test]
    fn selection_restricts_matches() {
        let logos = selected(&["Microsoft"]);
        assert!(is_brand_selected(&logos, "microsoft"));
        assert!(!is_brand_selected(&logos, "F5"));
    }

    #[test]
    fn all_call_sites_agree_on_the_matched_set() {
        let logos = selected(&["Factoria F5"]);
        let brands = vec!["Factoria".to_string(), "Microsoft".to_string()];

        let kept_brands = filter_brands(&logos, &brands);
        assert_eq!(kept_brands, vec![&"Factoria".to_string()]);

        let detections = vec![
            DetectionRecord {
                id: 1,
                file_id: 1,
                brand_id: Some(1),
                brand_name: None,
                brands: None,
                score: 0.8,
                bbox: [0.0, 0.0, 1.0, 1.0],
                t_start: None,
                t_end: None,
                frame: Some(1),
                frame_capture_url: None,
                frame_number: None,
            },
            DetectionRecord {
                id: 2,
                file_id: 1,
                brand_id: Some(2),
                brand_name: None,
                brands: None,
                score: 0.9,
                bbox: [0.0, 0.0, 1.0, 1.0],
                t_start: None,
                t_end: None,
                frame: Some(2),
                frame_capture_url: None,
                frame_number: None,
            },
        ];
        let kept = filter_detections(&logos, &detections, &brands);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);

        let mut stats = HashMap::new();
        stats.insert("Factoria".to_string(), BrandStats::default());
        stats.insert("Microsoft".to_string(), BrandStats::default());
        let kept_stats = filter_statistics(&logos, &stats);
        assert_eq!(kept_stats.len(), 1);
        assert!(kept_stats.contains_key("Factoria"));
    }

    #[test]
    fn toggle_flips_selection() {
        let mut logos = logo_catalog();
        toggle_brand(&mut logos, "Microsoft");
        assert!(logos.iter().find(|l| l.name == "Microsoft").unwrap().selected);
        toggle_brand(&mut logos, "Microsoft");
        assert!(!logos.iter().find(|l| l.name == "Microsoft").unwrap().selected);
    }
}
