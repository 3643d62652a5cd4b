//! Inline expression evaluation for sharding rules.
//!
//! The sharding engine only depends on [`ExpressionEvaluator`]; the
//! [`InlineExpressionEvaluator`] shipped here understands templates such as
//! `t_order_${order_id % 2}` and data-node lists such as
//! `ds_${0..1}.t_order_${0..1}`.

mod eval;
mod lexer;
mod parser;

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use shardline_common::{ExpressionError, ShardingValue};

use crate::eval::{eval_scalar, eval_values, EvalFailure};
use crate::parser::{normalize_placeholders, parse_template, split_top_level, Part, Template};

/// Variable name → value bindings for one evaluation.
pub type Bindings = BTreeMap<String, ShardingValue>;

/// Template evaluation used by the sharding algorithms and topology builder.
pub trait ExpressionEvaluator: Send + Sync {
    /// Resolve placeholder syntax once; the result is what gets evaluated.
    fn normalize(&self, expression: &str) -> Result<String, ExpressionError>;

    /// Evaluate to a single string. Fails with
    /// [`ExpressionError::UnresolvedBinding`] when a variable is not bound.
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<String, ExpressionError>;

    /// Expand a comma separated list of templates into every name it denotes.
    fn expand(&self, expression: &str) -> Result<Vec<String>, ExpressionError>;
}

/// Default evaluator. Parsed templates are memoised per expression text.
#[derive(Debug, Default)]
pub struct InlineExpressionEvaluator {
    cache: DashMap<String, Arc<Template>>,
}

impl InlineExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_templates(&self) -> usize {
        self.cache.len()
    }

    fn template(&self, expression: &str) -> Result<Arc<Template>, ExpressionError> {
        if let Some(t) = self.cache.get(expression) {
            return Ok(Arc::clone(t.value()));
        }
        let parsed = parse_template(expression).map_err(|reason| ExpressionError::Syntax {
            expression: expression.to_string(),
            reason,
        })?;
        let parsed = Arc::new(parsed);
        self.cache
            .insert(expression.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    fn expand_one(&self, expression: &str) -> Result<Vec<String>, ExpressionError> {
        let template = self.template(expression)?;
        let empty = Bindings::new();
        let mut results = vec![String::new()];
        for part in &template.parts {
            let choices: Vec<String> = match part {
                Part::Literal(text) => vec![text.clone()],
                Part::Segment(expr) => {
                    let mut seen = Vec::new();
                    for v in eval_values(expr, &empty).map_err(|f| to_error(expression, f))? {
                        let s = v.to_string();
                        if !seen.contains(&s) {
                            seen.push(s);
                        }
                    }
                    seen
                }
            };
            // Earlier segments vary slowest.
            let mut next = Vec::with_capacity(results.len() * choices.len());
            for prefix in &results {
                for choice in &choices {
                    next.push(format!("{}{}", prefix, choice));
                }
            }
            results = next;
        }
        Ok(results)
    }
}

impl ExpressionEvaluator for InlineExpressionEvaluator {
    fn normalize(&self, expression: &str) -> Result<String, ExpressionError> {
        let normalized = normalize_placeholders(expression.trim());
        self.template(&normalized)?;
        Ok(normalized)
    }

    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<String, ExpressionError> {
        let template = self.template(expression)?;
        let mut out = String::new();
        for part in &template.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Segment(expr) => {
                    let v = eval_scalar(expr, bindings).map_err(|f| to_error(expression, f))?;
                    out.push_str(&v.to_string());
                }
            }
        }
        Ok(out)
    }

    fn expand(&self, expression: &str) -> Result<Vec<String>, ExpressionError> {
        let normalized = normalize_placeholders(expression);
        let mut out = Vec::new();
        for piece in split_top_level(&normalized) {
            out.extend(self.expand_one(&piece)?);
        }
        Ok(out)
    }
}

fn to_error(expression: &str, failure: EvalFailure) -> ExpressionError {
    match failure {
        EvalFailure::Unresolved(name) => ExpressionError::UnresolvedBinding { name },
        EvalFailure::Message(reason) => ExpressionError::Evaluation {
            expression: expression.to_string(),
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(pairs: &[(&str, ShardingValue)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_evaluate_single_column() {
        let ev = InlineExpressionEvaluator::new();
        let out = ev
            .evaluate("t_order_${order_id % 2}", &bind(&[("order_id", 5.into())]))
            .unwrap();
        assert_eq!(out, "t_order_1");
    }

    #[test]
    fn test_evaluate_two_columns() {
        let ev = InlineExpressionEvaluator::new();
        let out = ev
            .evaluate(
                "t_${a}_${b}",
                &bind(&[("a", 1.into()), ("b", "x".into())]),
            )
            .unwrap();
        assert_eq!(out, "t_1_x");
    }

    #[test]
    fn test_normalize_rewrites_alternative_placeholder() {
        let ev = InlineExpressionEvaluator::new();
        assert_eq!(
            ev.normalize(" ds_$->{user_id % 2} ").unwrap(),
            "ds_${user_id % 2}"
        );
        assert!(matches!(
            ev.normalize("ds_${user_id %"),
            Err(ExpressionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unbound_variable() {
        let ev = InlineExpressionEvaluator::new();
        let err = ev
            .evaluate("ds_${user_id % 2}", &bind(&[("order_id", 1.into())]))
            .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::UnresolvedBinding {
                name: "user_id".into()
            }
        );
    }

    #[test]
    fn test_expand_cartesian_product_order() {
        let ev = InlineExpressionEvaluator::new();
        let names = ev.expand("ds_${0..1}.t_order_${0..1}").unwrap();
        assert_eq!(
            names,
            vec![
                "ds_0.t_order_0",
                "ds_0.t_order_1",
                "ds_1.t_order_0",
                "ds_1.t_order_1"
            ]
        );
    }

    #[test]
    fn test_expand_comma_list_and_literals() {
        let ev = InlineExpressionEvaluator::new();
        let names = ev
            .expand("ds_${['a','b']}.t_user, ds_2.t_user_$->{[0, 0, 1]}")
            .unwrap();
        assert_eq!(
            names,
            vec!["ds_a.t_user", "ds_b.t_user", "ds_2.t_user_0", "ds_2.t_user_1"]
        );
        assert_eq!(ev.expand("t_single").unwrap(), vec!["t_single"]);
    }

    #[test]
    fn test_expand_rejects_free_variables() {
        let ev = InlineExpressionEvaluator::new();
        assert!(matches!(
            ev.expand("t_${id}"),
            Err(ExpressionError::UnresolvedBinding { .. })
        ));
    }

    #[test]
    fn test_templates_are_cached() {
        let ev = InlineExpressionEvaluator::new();
        let b = bind(&[("id", 1.into())]);
        ev.evaluate("t_${id}", &b).unwrap();
        ev.evaluate("t_${id}", &b).unwrap();
        assert_eq!(ev.cached_templates(), 1);
    }

    #[test]
    fn test_concurrent_evaluation() {
        let ev = Arc::new(InlineExpressionEvaluator::new());
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let ev = Arc::clone(&ev);
                std::thread::spawn(move || {
                    let mut b = Bindings::new();
                    b.insert("id".into(), ShardingValue::Int(i));
                    ev.evaluate("t_${id % 4}", &b).unwrap()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), format!("t_{}", i % 4));
        }
    }
}
