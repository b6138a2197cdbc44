use jsonpath_lib::select;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::model::Repository;

/// Evaluate a JSONPath expression against the raw item array and return the
/// selected values, e.g. `$[?(@.stargazers_count > 100)]`.
pub fn apply_filter(items: Vec<Value>, expr: &str) -> Result<Vec<Value>> {
    let document = Value::Array(items);
    let matches = select(&document, expr).map_err(|e| SearchError::filter(format!("invalid JSONPath '{}': {:?}", expr, e)))?;
    let selected: Vec<Value> = matches.into_iter().cloned().collect();
    debug!("Filter '{}' kept {} values", expr, selected.len());
    Ok(selected)
}

pub fn into_repositories(values: Vec<Value>) -> Result<Vec<Repository>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value)
                .map_err(|e| SearchError::filter(format!("value {} is not a repository: {}", index, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<Value> {
        vec![
            json!({"full_name": "a/rust", "language": "Rust", "stargazers_count": 50,
                   "updated_at": "2023-01-01T00:00:00Z", "html_url": "https://github.com/a/rust"}),
            json!({"full_name": "b/py", "language": "Python", "stargazers_count": 500,
                   "updated_at": "2023-01-01T00:00:00Z", "html_url": "https://github.com/b/py"}),
        ]
    }

    #[test]
    fn filters_by_field() {
        let kept = apply_filter(items(), "$[?(@.language == 'Rust')]").unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["full_name"], "a/rust");

        let popular = apply_filter(items(), "$[?(@.stargazers_count > 100)]").unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0]["full_name"], "b/py");
    }

    #[test]
    fn invalid_expression_is_an_error() {
        let err = apply_filter(items(), "$[?(").unwrap_err();
        assert!(matches!(err, SearchError::Filter { .. }));
    }

    #[test]
    fn selected_scalars_are_not_repositories() {
        let names = apply_filter(items(), "$[*].full_name").unwrap();
        assert_eq!(names, vec![json!("a/rust"), json!("b/py")]);

        let err = into_repositories(names).unwrap_err();
        assert!(err.to_string().contains("value 0 is not a repository"));
    }

    #[test]
    fn whole_array_round_trips() {
        let repos = into_repositories(apply_filter(items(), "$[*]").unwrap()).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].stargazers_count, 500);
    }
}
