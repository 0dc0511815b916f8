use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub column: String,
    pub direction: SortDirection,
}

/// A bounded page of an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
    pub sorts: Vec<SortField>,
}

impl PageRequest {
    pub fn from_query(page: &str, limit: &str, sorts: &str, max_limit: i64) -> Self {
        let (offset, limit) = paginate_values(page, limit, max_limit);
        Self {
            offset,
            limit,
            sorts: parse_sorts(sorts),
        }
    }
}

/// Turns raw `page`/`limit` query values into `(offset, limit)`.
///
/// An unparsable or non-positive page becomes 1. An unparsable, non-positive
/// or oversized limit becomes `max_limit`.
pub fn paginate_values(page: &str, limit: &str, max_limit: i64) -> (i64, i64) {
    let page = match page.trim().parse::<i64>() {
        Ok(p) if p >= 1 => p,
        _ => 1,
    };
    let limit = match limit.trim().parse::<i64>() {
        Ok(l) if l >= 1 && l <= max_limit => l,
        _ => max_limit,
    };
    ((page - 1).saturating_mul(limit), limit)
}

lazy_static! {
    static ref COLUMN_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Parses `+field,-field,...`. Items without a sign, shorter than two
/// characters, or naming something that is not a plain identifier are dropped.
pub fn parse_sorts(raw: &str) -> Vec<SortField> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| item.len() >= 2)
        .filter_map(|item| {
            let (direction, column) = if let Some(rest) = item.strip_prefix('+') {
                (SortDirection::Asc, rest)
            } else if let Some(rest) = item.strip_prefix('-') {
                (SortDirection::Desc, rest)
            } else {
                return None;
            };
            COLUMN_RE.is_match(column).then(|| SortField {
                column: column.to_string(),
                direction,
            })
        })
        .collect()
}

/// `id ASC, name DESC`; empty when there is nothing to sort on, in which
/// case no `ORDER BY` must be emitted at all.
pub fn order_by_clause(sorts: &[SortField], prefix: &str) -> String {
    sorts
        .iter()
        .map(|s| {
            if prefix.is_empty() {
                format!("{} {}", s.column, s.direction.as_sql())
            } else {
                format!("{}.{} {}", prefix, s.column, s.direction.as_sql())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_values_defaults_and_clamps() {
        assert_eq!(paginate_values("1", "10", 100), (0, 10));
        assert_eq!(paginate_values("a", "10", 100), (0, 10));
        assert_eq!(paginate_values("1", "a", 100), (0, 100));
        assert_eq!(paginate_values("1", "200", 100), (0, 100));
        assert_eq!(paginate_values("3", "20", 100), (40, 20));
        assert_eq!(paginate_values("0", "0", 100), (0, 100));
        assert_eq!(paginate_values("", "", 100), (0, 100));
    }

    #[test]
    fn sort_clause_keeps_order_and_directions() {
        let sorts = parse_sorts("+id,-name,+created_at");
        assert_eq!(order_by_clause(&sorts, ""), "id ASC, name DESC, created_at ASC");
        assert_eq!(order_by_clause(&sorts, "u"), "u.id ASC, u.name DESC, u.created_at ASC");
    }

    #[test]
    fn malformed_sort_items_are_dropped() {
        let sorts = parse_sorts("id,+,-,x,+email,-bad;drop,+ ");
        assert_eq!(
            sorts,
            vec![SortField {
                column: "email".into(),
                direction: SortDirection::Asc
            }]
        );
    }

    #[test]
    fn empty_sort_input_yields_no_clause() {
        assert!(parse_sorts("").is_empty());
        assert_eq!(order_by_clause(&parse_sorts(""), ""), "");
    }
}
