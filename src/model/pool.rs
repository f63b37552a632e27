//! Attribute pools.

use super::field::Field;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A catalogue entry. `cluster` is only meaningful in the format pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolItem {
    pub id: String,
    pub name: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub cluster: Option<String>,
}

impl PoolItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cluster: None,
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }
}

/// One ordered pool per [`Field`].
///
/// Pools are read-only inputs for a generation call. A missing or empty
/// pool simply leaves that attribute unset on every candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolCatalogue {
    #[cfg_attr(feature = "serde", serde(rename = "PATTERNS"))]
    pub patterns: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "FORMATS"))]
    pub formats: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "VISUAL_STYLES"))]
    pub visual_styles: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "OPENINGS"))]
    pub openings: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "TONES"))]
    pub tones: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "TALENTS"))]
    pub talents: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "CTAS"))]
    pub ctas: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "PROOFS"))]
    pub proofs: Vec<PoolItem>,
    #[cfg_attr(feature = "serde", serde(rename = "SPECS"))]
    pub specs: Vec<PoolItem>,
}

impl PoolCatalogue {
    /// Returns the pool backing `field`.
    pub fn pool(&self, field: Field) -> &[PoolItem] {
        match field {
            Field::Pattern => &self.patterns,
            Field::Format => &self.formats,
            Field::VisualStyle => &self.visual_styles,
            Field::Opening => &self.openings,
            Field::Tone => &self.tones,
            Field::Talent => &self.talents,
            Field::Cta => &self.ctas,
            Field::ProofDevice => &self.proofs,
            Field::Spec => &self.specs,
        }
    }

    fn pool_mut(&mut self, field: Field) -> &mut Vec<PoolItem> {
        match field {
            Field::Pattern => &mut self.patterns,
            Field::Format => &mut self.formats,
            Field::VisualStyle => &mut self.visual_styles,
            Field::Opening => &mut self.openings,
            Field::Tone => &mut self.tones,
            Field::Talent => &mut self.talents,
            Field::Cta => &mut self.ctas,
            Field::ProofDevice => &mut self.proofs,
            Field::Spec => &mut self.specs,
        }
    }

    /// Replaces the pool for `field`.
    pub fn with_pool(mut self, field: Field, items: Vec<PoolItem>) -> Self {
        *self.pool_mut(field) = items;
        self
    }

    /// Replaces every pool that `overrides` provides (non-empty), keeping
    /// the current pool otherwise.
    pub fn with_overrides(mut self, overrides: &PoolCatalogue) -> Self {
        for field in Field::ALL {
            let items = overrides.pool(field);
            if !items.is_empty() {
                *self.pool_mut(field) = items.to_vec();
            }
        }
        self
    }

    /// Cluster of the format with the given id.
    pub fn format_cluster(&self, format_id: &str) -> Option<&str> {
        self.formats
            .iter()
            .find(|f| f.id == format_id)
            .and_then(|f| f.cluster.as_deref())
    }

    /// Built-in reference pools.
    pub fn standard() -> Self {
        fn items(pairs: &[(&str, &str)]) -> Vec<PoolItem> {
            pairs.iter().map(|(id, name)| PoolItem::new(*id, *name)).collect()
        }

        let formats = [
            ("UGC_3ReasonsWhy", "UGC - 3 Reasons Why", "ScriptShootEdit"),
            ("UGC_FlipTheScript", "UGC - Flip the Script", "ScriptShootEdit"),
            ("Static_SP", "Static - Social Proof", "DANDA"),
            ("Static_MR", "Static - Myth vs Reality", "DANDA"),
            ("Anim_List", "Animated - Listicle", "DANDA"),
            ("Video_PS", "Video - Problem/Solution", "Airpost"),
        ]
        .iter()
        .map(|(id, name, cluster)| PoolItem::new(*id, *name).with_cluster(*cluster))
        .collect();

        Self {
            patterns: items(&[
                ("ThreeReasonsWhy", "3 Reasons Why"),
                ("FlipTheScript", "Flip the Script"),
                ("ProblemSolution", "Problem -> Solution"),
                ("TestimonialStory", "Testimonial / Story"),
                ("MythVsReality", "Myth vs Reality"),
                ("FAQObjections", "FAQ / Objections"),
                ("BeforeAfter", "Before / After"),
                ("Comparison", "Comparison"),
            ]),
            formats,
            visual_styles: items(&[
                ("TalkingHead", "Talking Head"),
                ("Lifestyle", "Lifestyle"),
                ("MacroProduct", "Macro Product"),
                ("ScreenCap", "Screen Capture"),
                ("PackKinetic", "Pack + Kinetic Type"),
            ]),
            openings: items(&[
                ("VisualFirst", "Opening: Visual First"),
                ("CopyFirst", "Opening: Copy First"),
                ("VOFirst", "Opening: VO First"),
                ("SFXFirst", "Opening: SFX First"),
                ("LocationFirst", "Opening: Location First"),
                ("AppHUD", "Opening: App / HUD"),
            ]),
            tones: items(&[
                ("Rational", "Tone: Rational"),
                ("Emotional", "Tone: Emotional"),
                ("Urgent", "Tone: Urgent"),
                ("Humorous", "Tone: Humorous"),
                ("Hope", "Emotion: Hope"),
                ("FOMO", "Emotion: FOMO"),
                ("Trust", "Emotion: Trust"),
            ]),
            talents: items(&[("T1", "Talent 1"), ("T2", "Talent 2"), ("T3", "Talent 3")]),
            ctas: items(&[
                ("ShopNow", "CTA: Shop Now"),
                ("LearnMore", "CTA: Learn More"),
                ("GetStarted", "CTA: Get Started"),
                ("ClaimOffer", "CTA: Claim Offer"),
            ]),
            proofs: items(&[
                ("Receipts", "Proof: Receipts"),
                ("MetricsOverlay", "Proof: Metrics Overlay"),
                ("UGCMontage", "Proof: UGC Montage"),
                ("ScreenCapture", "Proof: Screen Capture"),
                ("Unboxing", "Proof: Unboxing"),
                ("SideBySide", "Proof: Side-by-Side"),
            ]),
            specs: items(&[("9:16", "Spec: 9:16"), ("1:1", "Spec: 1:1"), ("4:5", "Spec: 4:5")]),
        }
    }
}
