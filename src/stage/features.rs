//! Feature-extraction stage: turns a vision description into conditioning
//! text and short display tags.

use tracing::debug;

use crate::error::{ForgeError, Result};
use crate::provider::VisionDescriber;

/// Instruction handed to the vision capability when the catalog does not
/// override it.
pub const DEFAULT_INSTRUCTION: &str = "Describe the person's distinguishing visual features as a \
     short comma-separated list: hairstyle, eyewear, face shape, eye shape, apparent age. \
     Output only the list.";

/// Conditioning used when the vision capability returns nothing usable.
const FALLBACK_CONDITIONING: &str = "default portrait features";

#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    /// Cleaned comma-separated feature list fed to the generation prompt.
    pub conditioning: String,
    /// Short human-readable tags for progress display.
    pub display_tags: Vec<String>,
}

pub struct FeatureExtractor<'a> {
    vision: &'a dyn VisionDescriber,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(vision: &'a dyn VisionDescriber) -> Self {
        Self { vision }
    }

    pub async fn extract(&self, image_ref: &str, instruction: &str) -> Result<ExtractedFeatures> {
        let raw = self
            .vision
            .describe(image_ref, instruction)
            .await
            .map_err(|e| ForgeError::FeatureExtraction(e.to_string()))?;

        let conditioning = clean_description(&raw);
        debug!(raw_len = raw.len(), cleaned = %conditioning, "cleaned vision output");

        if conditioning.is_empty() {
            return Ok(ExtractedFeatures {
                conditioning: FALLBACK_CONDITIONING.to_string(),
                display_tags: default_display_tags(),
            });
        }

        let tags: Vec<String> = conditioning
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let display_tags = display_tags(&tags);

        Ok(ExtractedFeatures {
            conditioning,
            display_tags,
        })
    }
}

/// Vision models wrap their answer in fences, hedge, or repeat the gender;
/// strip all of that down to a clean comma-separated list.
fn clean_description(raw: &str) -> String {
    let unfenced = raw.replace("```", " ");
    let mut parts: Vec<String> = Vec::new();
    let mut has_gender = false;

    for part in unfenced.split(',') {
        let token = part
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
            .trim()
            .to_string();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if lower.contains("unable to") || lower.contains("cannot") || lower.starts_with("however") {
            continue;
        }
        if lower == "male" || lower == "female" {
            if has_gender {
                continue;
            }
            has_gender = true;
        }
        parts.push(token);
    }

    parts.join(", ")
}

/// Pick up to three tags worth surfacing to the user, preferring one from
/// each of the categories people actually recognize themselves by.
fn display_tags(tags: &[String]) -> Vec<String> {
    const CATEGORIES: [&[&str]; 3] = [
        &["hair", "forehead", "bangs"],
        &["face", "jaw", "chin", "cheek"],
        &["adult", "young", "mature", "child", "teen"],
    ];

    let mut used: Vec<usize> = Vec::new();
    for keywords in CATEGORIES {
        let found = tags.iter().enumerate().find(|(i, t)| {
            let lower = t.to_lowercase();
            !used.contains(i) && keywords.iter().any(|k| lower.contains(k))
        });
        if let Some((i, _)) = found {
            used.push(i);
        }
    }

    for (i, _) in tags.iter().enumerate() {
        if used.len() >= 3 {
            break;
        }
        if !used.contains(&i) {
            used.push(i);
        }
    }

    if used.is_empty() {
        return default_display_tags();
    }
    used.iter().map(|&i| format!("detected: {}", tags[i])).collect()
}

fn default_display_tags() -> Vec<String> {
    vec![
        "detected: hair silhouette".to_string(),
        "detected: facial contour".to_string(),
        "detected: age character".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct FixedVision(String);

    #[async_trait]
    impl VisionDescriber for FixedVision {
        async fn describe(&self, _image_ref: &str, _instruction: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_clean_strips_fences_and_quotes() {
        let cleaned = clean_description("```\n\"short hair, round face, young adult\"\n```");
        assert_eq!(cleaned, "short hair, round face, young adult");
    }

    #[test]
    fn test_clean_drops_refusal_fragments() {
        let cleaned = clean_description(
            "I'm unable to identify the person, short hair, however the style is clear, round face",
        );
        assert_eq!(cleaned, "short hair, round face");
    }

    #[test]
    fn test_clean_deduplicates_gender_tokens() {
        let cleaned = clean_description("female, long hair, female, oval face");
        assert_eq!(cleaned, "female, long hair, oval face");
    }

    #[test]
    fn test_display_tags_cover_categories() {
        let tags: Vec<String> = ["long braided hair", "soft jaw line", "young adult", "glasses"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let display = display_tags(&tags);
        assert_eq!(display.len(), 3);
        assert!(display[0].contains("hair"));
        assert!(display[1].contains("jaw"));
        assert!(display[2].contains("young"));
    }

    #[test]
    fn test_display_tags_pad_from_remaining() {
        let tags: Vec<String> = vec!["glasses".into(), "freckles".into()];
        let display = display_tags(&tags);
        assert_eq!(display.len(), 2);
        assert!(display[0].contains("glasses"));
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_empty_output() {
        let vision = FixedVision("```  ```".into());
        let features = FeatureExtractor::new(&vision)
            .extract("https://cdn.example/me.png", DEFAULT_INSTRUCTION)
            .await
            .unwrap();
        assert_eq!(features.conditioning, "default portrait features");
        assert_eq!(features.display_tags.len(), 3);
    }

    #[tokio::test]
    async fn test_extract_produces_conditioning_and_tags() {
        let vision = FixedVision("tied-up hair, defined chin, mature adult".into());
        let features = FeatureExtractor::new(&vision)
            .extract("https://cdn.example/me.png", DEFAULT_INSTRUCTION)
            .await
            .unwrap();
        assert_eq!(features.conditioning, "tied-up hair, defined chin, mature adult");
        assert_eq!(features.display_tags.len(), 3);
    }
}
