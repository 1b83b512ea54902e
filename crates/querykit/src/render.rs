//! Statement rendering: dialect dispatch and the MySQL renderer.
//!
//! A [`Dialect`] turns a query descriptor into a finalized [`Statement`]
//! holding the literal SQL text and the complete binding set (including
//! bindings merged up from UNION sub-selects). Rendering is pure: the
//! descriptor is never mutated, and rendering the same descriptor twice
//! yields identical output.

use crate::binding::Bindings;
use crate::query::{Kind, Limit, Query};

/// A finalized rendered statement.
///
/// Immutable by construction so SQL text and bindings cannot drift apart
/// between rendering and execution.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    /// UTF-8 SQL text terminated by a single `;`.
    pub sql: String,
    /// Every placeholder referenced by the text, in insertion order.
    pub bindings: Bindings,
}

/// A rendering dialect, selected once at descriptor construction.
pub trait Dialect: Send + Sync {
    /// Driver tag this dialect renders for (e.g. `"mysql"`).
    fn name(&self) -> &'static str;

    /// Render a descriptor into SQL text plus its ordered bindings.
    fn render(&self, query: &Query) -> Statement;
}

/// Drop empty fragments and join the rest with single spaces.
///
/// This assembly rule is uniform across all statement kinds and must not
/// change: output stability depends on it.
fn assemble(fragments: Vec<String>) -> String {
    fragments
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The MySQL-style rendering dialect.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySql;

impl MySql {
    /// `WHERE …` fragment: full-text match takes precedence over the plain
    /// predicate; both absent renders nothing.
    fn where_fragment(&self, query: &Query) -> String {
        if let Some(token) = &query.match_token {
            // Legacy surface: the predicate text doubles as the list of
            // matched columns.
            let columns = query.predicate.clone().unwrap_or_default();
            return format!("WHERE MATCH ({}) AGAINST ({})", columns, token);
        }
        match &query.predicate {
            Some(predicate) if !predicate.is_empty() => format!("WHERE {}", predicate),
            _ => String::new(),
        }
    }

    fn limit_fragment(&self, query: &Query) -> String {
        match query.limit {
            Some(Limit::Count(count)) => format!("LIMIT {}", count),
            Some(Limit::OffsetCount { offset, count }) => {
                format!("LIMIT {}, {}", offset, count)
            }
            None => String::new(),
        }
    }

    fn join_fragment(&self, query: &Query) -> String {
        let parts: Vec<String> = query
            .joins
            .iter()
            .map(|join| {
                // Alias syntax is normalized to uppercase AS only inside
                // join targets.
                let target = join.table.replace(" as ", " AS ");
                format!("{} JOIN {} ON {}", join.kind.to_uppercase(), target, join.on)
            })
            .collect();
        parts.join(" ")
    }

    fn projection(&self, query: &Query) -> String {
        if query.columns.is_empty() {
            "*".to_string()
        } else {
            query.columns.join(", ")
        }
    }

    fn select_fragments(&self, query: &Query, count: bool) -> Vec<String> {
        let projection = if count {
            format!("COUNT({})", self.projection(query))
        } else {
            self.projection(query)
        };
        let order = match &query.order {
            Some((column, direction)) => {
                format!("ORDER BY {} {}", column, direction.to_uppercase())
            }
            None => String::new(),
        };
        vec![
            projection,
            format!("FROM {}", query.table),
            self.join_fragment(query),
            self.where_fragment(query),
            order,
            self.limit_fragment(query),
        ]
    }

    fn render_insert(&self, query: &Query, bindings: &mut Bindings) -> String {
        let mut head = String::from("INSERT");
        if query.delayed {
            head.push_str(" DELAYED");
        }
        if query.ignore || matches!(query.kind, Kind::InsertIgnore) {
            head.push_str(" IGNORE");
        }

        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            format!("({})", query.columns.join(", "))
        };

        // Sub-selects supersede literal rows as the value source; their
        // binding sets are merged so execution sees every placeholder used
        // across the union.
        let source = if !query.unions.is_empty() {
            let selects: Vec<String> = query
                .unions
                .iter()
                .map(|sub| {
                    let rendered = self.render(sub);
                    bindings.merge(&rendered.bindings);
                    rendered
                        .sql
                        .trim_end()
                        .trim_end_matches(';')
                        .trim_end()
                        .to_string()
                })
                .collect();
            selects.join(" UNION ")
        } else if !query.rows.is_empty() {
            let rows: Vec<String> = query
                .rows
                .iter()
                .map(|row| format!("({})", row.join(", ")))
                .collect();
            format!("VALUES {}", rows.join(", "))
        } else {
            String::new()
        };

        let body = assemble(vec![format!("INTO {}", query.table), columns, source]);
        format!("{} {};", head, body)
    }
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn render(&self, query: &Query) -> Statement {
        let mut bindings = query.bindings.clone();
        let sql = match query.kind {
            Kind::Select => format!("SELECT {};", assemble(self.select_fragments(query, false))),
            Kind::Count => format!("SELECT {};", assemble(self.select_fragments(query, true))),
            Kind::Update => {
                let assignments: Vec<String> = query
                    .assignments
                    .iter()
                    .map(|(column, token)| format!("{} = {}", column, token))
                    .collect();
                let set = if assignments.is_empty() {
                    String::new()
                } else {
                    format!("SET {}", assignments.join(", "))
                };
                let body = assemble(vec![
                    query.table.clone(),
                    set,
                    self.where_fragment(query),
                    self.limit_fragment(query),
                ]);
                format!("UPDATE {};", body)
            }
            Kind::Delete => {
                let body = assemble(vec![
                    format!("FROM {}", query.table),
                    self.where_fragment(query),
                    self.limit_fragment(query),
                ]);
                format!("DELETE {};", body)
            }
            Kind::Insert | Kind::InsertIgnore => self.render_insert(query, &mut bindings),
            Kind::Verbatim => {
                // Interleaved trailing semicolons and whitespace all count
                // as terminator noise.
                let body = query
                    .raw_sql
                    .trim_end_matches(|c: char| c == ';' || c.is_whitespace());
                format!("{};", body)
            }
        };
        Statement { sql, bindings }
    }
}
