// src/classification/keywords.rs
//
// Named vocabularies for the classification cascade, plus the word-aware
// matcher every rule goes through. All terms are lowercase.

/// Person, body-part and wearable labels. Never an item being consumed.
pub const EXCLUDED_LABELS: &[&str] = &[
    "person", "people", "human", "man", "woman", "child", "hand", "arm", "leg", "foot", "head",
    "face", "body", "finger", "palm", "wrist", "elbow", "shoulder", "torso", "chest", "back",
    "neck", "hair", "skin", "watch", "strap", "band", "bracelet", "wristband", "belt", "shoe",
    "clothing", "tie",
];

/// Labels that name a medicine outright
pub const MEDICINE_LABELS: &[&str] = &[
    "pill", "medicine", "capsule", "tablet", "vitamin", "medication", "pharmacy", "prescription",
    "drug",
];

/// Labels that name a drink or a drink container outright
pub const BEVERAGE_LABELS: &[&str] = &[
    "juice box", "juicebox", "juice", "tetra pak", "tetra", "carton", "water", "drink",
    "beverage", "soda", "cola", "beer", "milk", "wine glass", "cup", "mug", "glass", "can",
];

/// Labels that name a food item outright
pub const FOOD_LABELS: &[&str] = &[
    "apple", "banana", "orange", "sandwich", "pizza", "donut", "doughnut", "cake", "hot dog",
    "hotdog", "broccoli", "carrot", "muffin", "cupcake", "bagel", "bread", "cookie", "food",
    "snack", "fruit", "bowl", "plate",
];

/// Labels a detector gives to pill bottles and water bottles alike.
/// Only these are worth reading text from.
pub const AMBIGUOUS_LABELS: &[&str] = &[
    "bottle", "container", "package", "box", "cylinder", "jar", "tube", "bag", "wrapper",
    "object",
];

/// Containers that, held at the mouth, are assumed to hold a drink
pub const CONSUMING_CONTAINER_LABELS: &[&str] = &[
    "can", "cup", "mug", "glass", "container", "box", "carton", "package", "bag", "bottle",
];

/// Printed on medicine packaging: dosage units, drug names, pharmacy terms.
/// Generic label wording (warnings, lot numbers, expiry) also appears on
/// food and stays out.
pub const MEDICINE_TEXT: &[&str] = &[
    "mg", "mcg", "iu", "milligram", "microgram", "international unit", "tablet", "tablets",
    "capsule", "capsules", "caplet", "softgel", "gelcap", "gel cap", "pill", "pills", "dose",
    "dosage", "medicine", "medication", "drug", "prescription", "rx", "pharmacy", "pharmacist",
    "pharma", "ndc", "usp", "otc", "vitamin", "supplement", "aspirin", "bayer", "ibuprofen",
    "acetaminophen", "tylenol", "advil", "motrin", "aleve", "naproxen", "paracetamol",
    "diphenhydramine", "loratadine", "cetirizine", "omeprazole", "simvastatin", "lisinopril",
    "metformin", "take daily", "twice daily",
];

/// Bakery, snack, fruit and packaging vocabulary
pub const FOOD_TEXT: &[&str] = &[
    "food", "snack", "muffin", "cake", "cookie", "cracker", "chips", "bread", "bagel",
    "croissant", "donut", "pastry", "cereal", "granola", "oatmeal", "whole grain", "wheat",
    "chocolate", "candy", "sugar", "flour", "butter", "cheese", "yogurt", "fruit", "apple",
    "banana", "orange", "berry", "strawberry", "blueberry", "sandwich", "pizza", "pasta",
    "rice", "soup", "salad", "nuts", "peanut", "almond", "bar", "bakery", "baked", "fresh",
    "organic", "natural", "calories", "nutrition facts", "serving size", "ingredients",
    "net wt", "peel",
];

/// Drink vocabulary and volume units
pub const BEVERAGE_TEXT: &[&str] = &[
    "water", "juice", "soda", "cola", "pepsi", "coke", "sprite", "drink", "beverage", "milk",
    "tea", "coffee", "lemonade", "smoothie", "sparkling", "mineral", "spring water",
    "hydration", "electrolyte", "ml", "fl oz", "liter", "litre",
];

/// True when `term` occurs in `haystack` as a whole word or phrase.
///
/// The match must start after a non-letter (or at the start) and end before a
/// non-letter (or at the end), allowing one plural `s`/`es`. Digits count as
/// non-letters, so `"200mg"` contains `"mg"` while `"bandage"` does not
/// contain `"band"`. Both inputs are expected in lowercase.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(term) {
        let start = from + offset;
        let end = start + term.len();

        let starts_clean = !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphabetic);
        if starts_clean && ends_clean(&haystack[end..]) {
            return true;
        }

        // Step one character forward, staying on a char boundary
        from = start
            + haystack[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }
    false
}

fn ends_clean(rest: &str) -> bool {
    let at_boundary = |s: &str| !s.chars().next().is_some_and(char::is_alphabetic);
    at_boundary(rest)
        || rest.strip_prefix("es").is_some_and(at_boundary)
        || rest.strip_prefix('s').is_some_and(at_boundary)
}

/// First term of `set` found in `haystack`
pub fn find_term<'a>(haystack: &str, set: &[&'a str]) -> Option<&'a str> {
    set.iter().copied().find(|term| contains_term(haystack, term))
}

pub fn contains_any(haystack: &str, set: &[&str]) -> bool {
    find_term(haystack, set).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_words_only() {
        assert!(contains_term("cup", "cup"));
        assert!(contains_term("paper cup", "cup"));
        assert!(!contains_term("cupcake", "cup"));
        assert!(!contains_term("bandage", "band"));
        assert!(!contains_term("scan", "can"));
    }

    #[test]
    fn test_plurals_and_digits() {
        assert!(contains_term("two tablets", "tablet"));
        assert!(contains_term("peaches and berries", "peach"));
        assert!(contains_term("ibuprofen 200mg", "mg"));
        assert!(contains_term("500ml", "ml"));
        assert!(!contains_term("mgx", "mg"));
    }

    #[test]
    fn test_phrases() {
        assert!(contains_term("whole grain muffin", "whole grain"));
        assert!(contains_term("a juice box", "juice box"));
        assert!(!contains_term("whole grainy", "whole grain"));
    }

    #[test]
    fn test_later_occurrence_still_matches() {
        // first hit is inside a word, second one is clean
        assert!(contains_term("scan the can", "can"));
    }

    #[test]
    fn test_find_term_respects_set_order() {
        assert_eq!(find_term("vitamin d3 1000 iu", MEDICINE_TEXT), Some("iu"));
        assert_eq!(find_term("nothing relevant", MEDICINE_TEXT), None);
        assert!(contains_any("whole grain muffin", FOOD_TEXT));
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert!(!contains_term("crème brûlée", "rule"));
        assert!(contains_term("café milk", "milk"));
    }
}
