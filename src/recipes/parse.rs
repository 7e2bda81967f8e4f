use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// Structured recipe decoded from the text service reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub name: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub nutrition: Vec<String>,
}

/// Decodes a reply into a [`Recipe`].
///
/// The reply must be a JSON object. Missing fields come out empty, unknown ones
/// are ignored, and list entries that are not strings are rendered as text.
pub fn parse_recipe(raw: &str) -> Result<Recipe, AppError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| AppError::Parse(format!("invalid JSON: {}", e)))?;
    let Value::Object(obj) = value else {
        return Err(AppError::Parse("expected a JSON object".into()));
    };

    Ok(Recipe {
        name: obj.get("name").and_then(display),
        ingredients: display_list(obj.get("ingredients")),
        instructions: display_list(obj.get("instructions")),
        nutrition: display_list(obj.get("nutrition")),
    })
}

fn display_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries.iter().filter_map(display).collect(),
        Some(other) => display(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // {"salt": "1 tsp"} -> "salt: 1 tsp"
        Value::Object(map) => Some(
            map.iter()
                .filter_map(|(k, v)| display(v).map(|v| format!("{}: {}", k, v)))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Array(entries) => Some(
            entries
                .iter()
                .filter_map(display)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_recipe() {
        let recipe = parse_recipe(
            r#"{"name":"Soup","ingredients":["water","salt"],"instructions":["boil"],"nutrition":["low"]}"#,
        )
        .unwrap();
        assert_eq!(recipe.name.as_deref(), Some("Soup"));
        assert_eq!(recipe.ingredients, vec!["water", "salt"]);
        assert_eq!(recipe.instructions, vec!["boil"]);
        assert_eq!(recipe.nutrition, vec!["low"]);
    }

    #[test]
    fn not_json_is_a_parse_error() {
        let err = parse_recipe("not json").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn json_that_is_not_an_object_is_a_parse_error() {
        assert_eq!(parse_recipe("[1, 2]").unwrap_err().kind(), "parse");
        assert_eq!(parse_recipe("\"soup\"").unwrap_err().kind(), "parse");
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let recipe = parse_recipe(r#"{"ingredients":["egg"],"servings":2}"#).unwrap();
        assert_eq!(recipe.name, None);
        assert_eq!(recipe.ingredients, vec!["egg"]);
        assert!(recipe.instructions.is_empty());
        assert!(recipe.nutrition.is_empty());
    }

    #[test]
    fn non_string_entries_become_display_strings() {
        let recipe = parse_recipe(
            r#"{"name":"Omelette",
                "ingredients":[{"eggs":2}, "salt", null],
                "instructions":"Whisk and fry",
                "nutrition":[{"calories":180}, 12]}"#,
        )
        .unwrap();
        assert_eq!(recipe.ingredients, vec!["eggs: 2", "salt"]);
        assert_eq!(recipe.instructions, vec!["Whisk and fry"]);
        assert_eq!(recipe.nutrition, vec!["calories: 180", "12"]);
    }
}
