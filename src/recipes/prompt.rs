/// Soft cap on recipe length the model is asked to respect.
pub const RECIPE_WORD_LIMIT: usize = 50;

/// Builds the recipe request sent to the text service.
pub fn build_prompt(item_names: &[String]) -> String {
    format!(
        "Generate a recipe based on the following pantry items ({limit} words or less): {items}. \
         Respond with JSON only, using exactly four fields: \
         \"name\" (string), \"ingredients\" (list of strings), \
         \"instructions\" (list of strings) and \"nutrition\" (list of strings).",
        limit = RECIPE_WORD_LIMIT,
        items = item_names.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_items_in_order() {
        let prompt = build_prompt(&["rice".into(), "beans".into(), "lime".into()]);
        assert!(prompt.contains("rice, beans, lime."));
    }

    #[test]
    fn prompt_names_the_four_fields() {
        let prompt = build_prompt(&["egg".into()]);
        for field in ["\"name\"", "\"ingredients\"", "\"instructions\"", "\"nutrition\""] {
            assert!(prompt.contains(field), "missing {}", field);
        }
        assert!(prompt.contains("50 words or less"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(build_prompt(&names), build_prompt(&names));
    }
}
