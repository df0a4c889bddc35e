//! Static registry of mission pipeline shapes.
//!
//! Mission types are a small fixed enumeration; each entry declares which
//! stages its pipeline needs and which external capability serves it. One
//! generic orchestrator consumes these descriptors instead of branching per
//! mission.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    /// Stylized portrait from a single photo, conditioned on extracted
    /// visual features.
    StylizedAvatar,
    /// Festive face-fusion transform searched across a workflow/template
    /// fallback space.
    FestiveTransform,
    CouplePortrait,
    FamilyPortrait,
    PhotoRestore,
    /// Local card draw; no provider round-trip.
    FortuneCard,
}

impl MissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StylizedAvatar => "stylized_avatar",
            Self::FestiveTransform => "festive_transform",
            Self::CouplePortrait => "couple_portrait",
            Self::FamilyPortrait => "family_portrait",
            Self::PhotoRestore => "photo_restore",
            Self::FortuneCard => "fortune_card",
        }
    }

    pub fn descriptor(&self) -> &'static MissionDescriptor {
        descriptor(*self)
    }
}

impl fmt::Display for MissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time pipeline shape for one mission type. Never mutated.
#[derive(Debug, Clone)]
pub struct MissionDescriptor {
    pub kind: MissionKind,
    pub name: &'static str,
    /// Whether user photos must be published to a public URL before the
    /// provider can consume them.
    pub needs_publish: bool,
    pub needs_feature_extraction: bool,
    pub needs_caption: bool,
    pub needs_gender: bool,
    /// Subject photos the mission consumes; 0 for missions without photo
    /// input.
    pub subject_count: usize,
    /// External capability slot serving the generating stage.
    pub capability_slot: &'static str,
    pub model_id: &'static str,
    /// Substitute caption when the caption stage degrades.
    pub default_caption: &'static str,
}

pub const REGISTRY: &[MissionDescriptor] = &[
    MissionDescriptor {
        kind: MissionKind::StylizedAvatar,
        name: "Stylized New Year Avatar",
        needs_publish: true,
        needs_feature_extraction: true,
        needs_caption: true,
        needs_gender: true,
        subject_count: 1,
        capability_slot: "image-synthesis",
        model_id: "portrait-stylize-v1",
        default_caption: "A bright new year, full of fortune and joy!",
    },
    MissionDescriptor {
        kind: MissionKind::FestiveTransform,
        name: "Festive Transform",
        needs_publish: true,
        needs_feature_extraction: false,
        needs_caption: true,
        needs_gender: true,
        subject_count: 1,
        capability_slot: "image-synthesis",
        model_id: "face-fusion-hd",
        default_caption: "May fortune knock on your door this year!",
    },
    MissionDescriptor {
        kind: MissionKind::CouplePortrait,
        name: "Couple Portrait",
        needs_publish: true,
        needs_feature_extraction: false,
        needs_caption: true,
        needs_gender: false,
        subject_count: 2,
        capability_slot: "image-synthesis",
        model_id: "face-fusion-hd",
        default_caption: "Two hearts, one wonderful year ahead!",
    },
    MissionDescriptor {
        kind: MissionKind::FamilyPortrait,
        name: "Family Portrait",
        needs_publish: true,
        needs_feature_extraction: false,
        needs_caption: true,
        needs_gender: false,
        subject_count: 3,
        capability_slot: "image-synthesis",
        model_id: "face-fusion-hd",
        default_caption: "A house full of warmth and blessings!",
    },
    MissionDescriptor {
        kind: MissionKind::PhotoRestore,
        name: "Old Photo Restoration",
        needs_publish: true,
        needs_feature_extraction: false,
        needs_caption: false,
        needs_gender: false,
        subject_count: 1,
        capability_slot: "image-synthesis",
        model_id: "photo-restore-v1",
        default_caption: "",
    },
    MissionDescriptor {
        kind: MissionKind::FortuneCard,
        name: "Fortune Card Draw",
        needs_publish: false,
        needs_feature_extraction: false,
        needs_caption: false,
        needs_gender: false,
        subject_count: 0,
        capability_slot: "local",
        model_id: "card-pool",
        default_caption: "",
    },
];

/// Registry lookup. The table covers the whole `MissionKind` enum.
pub fn descriptor(kind: MissionKind) -> &'static MissionDescriptor {
    REGISTRY
        .iter()
        .find(|d| d.kind == kind)
        .expect("registry covers every mission kind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_kind() {
        for kind in [
            MissionKind::StylizedAvatar,
            MissionKind::FestiveTransform,
            MissionKind::CouplePortrait,
            MissionKind::FamilyPortrait,
            MissionKind::PhotoRestore,
            MissionKind::FortuneCard,
        ] {
            assert_eq!(descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn test_only_avatar_extracts_features() {
        for d in REGISTRY {
            assert_eq!(
                d.needs_feature_extraction,
                d.kind == MissionKind::StylizedAvatar
            );
        }
    }

    #[test]
    fn test_subject_counts() {
        assert_eq!(descriptor(MissionKind::CouplePortrait).subject_count, 2);
        assert_eq!(descriptor(MissionKind::FamilyPortrait).subject_count, 3);
        assert_eq!(descriptor(MissionKind::FortuneCard).subject_count, 0);
    }

    #[test]
    fn test_caption_missions_have_default_caption() {
        for d in REGISTRY {
            if d.needs_caption {
                assert!(!d.default_caption.is_empty());
            }
        }
    }
}
