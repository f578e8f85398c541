// src/classification/rules.rs
//
// The classification cascade as ordered tables. Each table is evaluated
// top-down and the first matching rule decides.

use super::keywords::{
    contains_any, find_term, BEVERAGE_LABELS, BEVERAGE_TEXT, CONSUMING_CONTAINER_LABELS,
    FOOD_LABELS, FOOD_TEXT, MEDICINE_LABELS, MEDICINE_TEXT,
};
use crate::types::{BoundingBox, Category, ClassifierConfig};

/// Matches when the detector label contains any of `terms`
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub name: &'static str,
    pub terms: &'static [&'static str],
    pub category: Category,
}

impl LabelRule {
    pub fn matches(&self, label: &str) -> bool {
        contains_any(label, self.terms)
    }
}

/// Matches when the extracted text contains any of `terms`
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    pub name: &'static str,
    pub terms: &'static [&'static str],
    pub category: Category,
}

/// Matches on bounding-box geometry alone
#[derive(Clone, Copy)]
pub struct ShapeRule {
    pub name: &'static str,
    pub predicate: fn(&BoundingBox, &ClassifierConfig) -> bool,
    pub category: Category,
}

/// Labels clear enough to skip text extraction
pub const LABEL_FAST_PATH: &[LabelRule] = &[
    LabelRule {
        name: "medicine label",
        terms: MEDICINE_LABELS,
        category: Category::Pill,
    },
    LabelRule {
        name: "beverage label",
        terms: BEVERAGE_LABELS,
        category: Category::Water,
    },
    LabelRule {
        name: "food label",
        terms: FOOD_LABELS,
        category: Category::Food,
    },
];

/// Medicine outranks food, food outranks beverage
pub const TEXT_PRIORITY: &[TextRule] = &[
    TextRule {
        name: "medicine text",
        terms: MEDICINE_TEXT,
        category: Category::Pill,
    },
    TextRule {
        name: "food text",
        terms: FOOD_TEXT,
        category: Category::Food,
    },
    TextRule {
        name: "beverage text",
        terms: BEVERAGE_TEXT,
        category: Category::Water,
    },
];

/// While consuming, a container that no text tier claimed is held as a drink
pub const CONSUMING_CONTAINER: &[LabelRule] = &[LabelRule {
    name: "container at mouth",
    terms: CONSUMING_CONTAINER_LABELS,
    category: Category::Water,
}];

/// Defaults for ambiguous labels once text gave nothing
pub const LABEL_DEFAULTS: &[LabelRule] = &[
    LabelRule {
        name: "bottle default",
        terms: &["bottle"],
        category: Category::Water,
    },
    LabelRule {
        name: "box default",
        terms: &["box", "carton"],
        category: Category::Water,
    },
    LabelRule {
        name: "bag default",
        terms: &["bag", "wrapper"],
        category: Category::Food,
    },
];

/// Last resort. Ends in a catch-all so the cascade is total.
pub const SHAPE_FALLBACK: &[ShapeRule] = &[
    ShapeRule {
        name: "elongated",
        predicate: |b, c| b.aspect_ratio() > c.elongated_aspect,
        category: Category::Water,
    },
    ShapeRule {
        name: "large",
        predicate: |b, c| b.area() > c.large_area,
        category: Category::Food,
    },
    ShapeRule {
        name: "pill band",
        predicate: |b, c| {
            let area = b.area();
            area > c.pill_min_area && area < c.pill_max_area && b.aspect_ratio() < c.pill_max_aspect
        },
        category: Category::Pill,
    },
    ShapeRule {
        name: "anything else",
        predicate: |_, _| true,
        category: Category::Food,
    },
];

pub fn first_label_match<'a>(rules: &'a [LabelRule], label: &str) -> Option<&'a LabelRule> {
    rules.iter().find(|rule| rule.matches(label))
}

/// First rule whose vocabulary occurs in `text`, with the term that hit
pub fn first_text_match<'a>(
    rules: &'a [TextRule],
    text: &str,
) -> Option<(&'a TextRule, &'static str)> {
    if text.is_empty() {
        return None;
    }
    rules
        .iter()
        .find_map(|rule| find_term(text, rule.terms).map(|term| (rule, term)))
}

pub fn first_shape_match<'a>(
    rules: &'a [ShapeRule],
    bbox: &BoundingBox,
    config: &ClassifierConfig,
) -> Option<&'a ShapeRule> {
    rules.iter().find(|rule| (rule.predicate)(bbox, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(w: f32, h: f32) -> Category {
        let bbox = BoundingBox::new(0.0, 0.0, w, h);
        first_shape_match(SHAPE_FALLBACK, &bbox, &ClassifierConfig::default())
            .map(|r| r.category)
            .unwrap_or(Category::Unknown)
    }

    #[test]
    fn test_fast_path_order() {
        let cat = |label: &str| first_label_match(LABEL_FAST_PATH, label).map(|r| r.category);
        assert_eq!(cat("juice box"), Some(Category::Water));
        assert_eq!(cat("pill bottle"), Some(Category::Pill));
        assert_eq!(cat("banana"), Some(Category::Food));
        assert_eq!(cat("cupcake"), Some(Category::Food));
        assert_eq!(cat("bottle"), None);
        assert_eq!(cat("box"), None);
    }

    #[test]
    fn test_text_priority_medicine_over_food_over_beverage() {
        let (rule, term) = first_text_match(TEXT_PRIORITY, "vitamin gummies fruit juice").unwrap();
        assert_eq!(rule.category, Category::Pill);
        assert_eq!(term, "vitamin");

        let (rule, _) = first_text_match(TEXT_PRIORITY, "orange juice").unwrap();
        assert_eq!(rule.category, Category::Food);

        let (rule, _) = first_text_match(TEXT_PRIORITY, "spring water 500ml").unwrap();
        assert_eq!(rule.category, Category::Water);

        assert!(first_text_match(TEXT_PRIORITY, "").is_none());
        assert!(first_text_match(TEXT_PRIORITY, "qwerty").is_none());
    }

    #[test]
    fn test_consuming_container_rule() {
        assert!(first_label_match(CONSUMING_CONTAINER, "plastic container").is_some());
        assert!(first_label_match(CONSUMING_CONTAINER, "jar").is_none());
    }

    #[test]
    fn test_label_defaults() {
        let cat = |label: &str| first_label_match(LABEL_DEFAULTS, label).map(|r| r.category);
        assert_eq!(cat("bottle"), Some(Category::Water));
        assert_eq!(cat("box"), Some(Category::Water));
        assert_eq!(cat("bag"), Some(Category::Food));
        assert_eq!(cat("jar"), None);
    }

    #[test]
    fn test_shape_fallback() {
        assert_eq!(shape(30.0, 120.0), Category::Water);
        assert_eq!(shape(150.0, 150.0), Category::Food);
        assert_eq!(shape(80.0, 80.0), Category::Pill);
        // Too small for the pill band
        assert_eq!(shape(40.0, 40.0), Category::Food);
    }
}
