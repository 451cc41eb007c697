//! Query-string driven listing shared by the provider, car and promotion
//! collections: equality/range filters, projection, sorting and pagination.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::DateTime;
use sea_orm::{
    sea_query::ColumnType, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IdenStatic,
    Iterable, Order, PaginatorTrait, PrimaryKeyToColumn, QueryFilter, QueryOrder, QuerySelect,
    Select, Value,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: u64 = 25;
pub const MAX_LIMIT: u64 = 100;

/// Row offsets are bound as signed 64-bit integers by every backend.
const MAX_OFFSET: u64 = i64::MAX as u64;

const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "in" => Ok(FilterOp::In),
            other => Err(AppError::BadRequest(format!(
                "Unsupported filter operator '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<FieldFilter>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            select: None,
            sort: Vec::new(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(key: &str, raw: &str) -> AppResult<u64> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(format!(
            "'{}' must be a positive integer",
            key
        ))),
    }
}

impl ListQuery {
    /// Parses `field=v`, `field[op]=v`, `select`, `sort`, `page` and `limit`.
    pub fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut query = ListQuery::default();

        if let Some(raw) = params.get("select") {
            let fields = split_list(raw);
            if !fields.is_empty() {
                query.select = Some(fields);
            }
        }

        if let Some(raw) = params.get("sort") {
            query.sort = split_list(raw)
                .into_iter()
                .map(|field| match field.strip_prefix('-') {
                    Some(name) => SortKey {
                        field: name.to_string(),
                        descending: true,
                    },
                    None => SortKey {
                        field,
                        descending: false,
                    },
                })
                .collect();
        }

        if let Some(raw) = params.get("page") {
            query.page = parse_positive("page", raw)?;
        }

        if let Some(raw) = params.get("limit") {
            query.limit = parse_positive("limit", raw)?.min(MAX_LIMIT);
        }
        query.window()?;

        let mut filters: Vec<FieldFilter> = params
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, raw)| {
                let (field, op) = match key.split_once('[') {
                    Some((field, rest)) => {
                        let op = rest.strip_suffix(']').ok_or_else(|| {
                            AppError::BadRequest(format!("Malformed filter '{}'", key))
                        })?;
                        (field.to_string(), op.parse()?)
                    }
                    None => (key.clone(), FilterOp::Eq),
                };
                Ok(FieldFilter {
                    field,
                    op,
                    raw: raw.clone(),
                })
            })
            .collect::<AppResult<_>>()?;
        filters.sort_by(|a, b| a.field.cmp(&b.field));
        query.filters = filters;

        Ok(query)
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Zero-based page index and page size, or 400 when the page lies past any addressable row.
    fn window(&self) -> AppResult<(u64, u64)> {
        let index = self.page.checked_sub(1).ok_or_else(|| {
            AppError::BadRequest("'page' must be a positive integer".to_string())
        })?;
        match index.checked_mul(self.limit) {
            Some(offset) if offset <= MAX_OFFSET => Ok((index, self.limit)),
            _ => Err(AppError::BadRequest(format!(
                "'page' {} is out of range",
                self.page
            ))),
        }
    }

    pub fn condition<E>(&self) -> AppResult<Condition>
    where
        E: EntityTrait,
        E::Column: FromStr,
    {
        let mut condition = Condition::all();
        for filter in &self.filters {
            let column = resolve_column::<E>(&filter.field)?;
            let column_type = column.def().get_column_type().clone();
            let value = |raw: &str| parse_value(&column_type, &filter.field, raw);

            condition = condition.add(match filter.op {
                FilterOp::Eq => column.eq(value(filter.raw.as_str())?),
                FilterOp::Gt => column.gt(value(filter.raw.as_str())?),
                FilterOp::Gte => column.gte(value(filter.raw.as_str())?),
                FilterOp::Lt => column.lt(value(filter.raw.as_str())?),
                FilterOp::Lte => column.lte(value(filter.raw.as_str())?),
                FilterOp::In => column.is_in(
                    split_list(&filter.raw)
                        .iter()
                        .map(|raw| value(raw.as_str()))
                        .collect::<AppResult<Vec<_>>>()?,
                ),
            });
        }
        Ok(condition)
    }
}

/// Accepts both the snake_case column name and its camelCase form.
pub fn resolve_column<E>(field: &str) -> AppResult<E::Column>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    E::Column::from_str(field)
        .map_err(|_| AppError::BadRequest(format!("Unknown field '{}'", field)))
}

fn parse_value(column_type: &ColumnType, field: &str, raw: &str) -> AppResult<Value> {
    let invalid = || AppError::BadRequest(format!("Invalid value '{}' for field '{}'", raw, field));

    let value = match column_type {
        ColumnType::TinyInteger | ColumnType::SmallInteger | ColumnType::Integer => {
            Value::from(raw.parse::<i32>().map_err(|_| invalid())?)
        }
        ColumnType::BigInteger => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => {
            Value::from(raw.parse::<f64>().map_err(|_| invalid())?)
        }
        ColumnType::Boolean => Value::from(raw.parse::<bool>().map_err(|_| invalid())?),
        ColumnType::Uuid => Value::from(Uuid::parse_str(raw).map_err(|_| invalid())?),
        ColumnType::TimestampWithTimeZone | ColumnType::Timestamp | ColumnType::DateTime => {
            Value::from(DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?)
        }
        _ => Value::from(raw.to_string()),
    };
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

pub fn pagination(page: u64, limit: u64, total: u64) -> Pagination {
    let next = page
        .checked_mul(limit)
        .filter(|seen| *seen < total)
        .and_then(|_| page.checked_add(1))
        .map(|page| PageRef { page, limit });
    let prev = page
        .checked_sub(1)
        .filter(|page| *page > 0)
        .map(|page| PageRef { page, limit });
    Pagination { next, prev }
}

#[derive(Debug)]
pub struct ListPage {
    pub items: Vec<serde_json::Value>,
    pub total: u64,
    pub pagination: Pagination,
}

/// Runs `base` with the query's filters, projection, ordering and page window.
pub async fn fetch_list<E, C>(
    db: &C,
    base: Select<E>,
    query: &ListQuery,
    default_sort: E::Column,
) -> AppResult<ListPage>
where
    E: EntityTrait,
    E::Column: FromStr,
    C: ConnectionTrait,
{
    let mut select = base.filter(query.condition::<E>()?);

    if query.sort.is_empty() {
        select = select.order_by(default_sort, Order::Desc);
    } else {
        for key in &query.sort {
            let column = resolve_column::<E>(&key.field)?;
            let order = if key.descending { Order::Desc } else { Order::Asc };
            select = select.order_by(column, order);
        }
    }

    if let Some(fields) = &query.select {
        let mut columns: Vec<E::Column> = E::PrimaryKey::iter()
            .map(|key| key.into_column())
            .collect();
        for field in fields {
            let column = resolve_column::<E>(field)?;
            if !columns.iter().any(|c| c.as_str() == column.as_str()) {
                columns.push(column);
            }
        }
        select = select.select_only().columns(columns);
    }

    let (index, limit) = query.window()?;
    let paginator = select.into_json().paginate(db, limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(index).await?;

    Ok(ListPage {
        items,
        total,
        pagination: pagination(query.page, query.limit, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::car;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = ListQuery::from_params(&HashMap::new()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert!(query.filters.is_empty());
        assert!(query.select.is_none());
    }

    #[test]
    fn test_parses_range_operators_and_sort() {
        let query = ListQuery::from_params(&params(&[
            ("pricePerDay[gte]", "100"),
            ("brand", "Toyota"),
            ("sort", "-year,brand"),
            ("select", "brand, model"),
            ("page", "3"),
            ("limit", "10"),
        ]))
        .unwrap();

        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset(), 20);
        assert_eq!(
            query.select,
            Some(vec!["brand".to_string(), "model".to_string()])
        );
        assert_eq!(
            query.sort,
            vec![
                SortKey { field: "year".to_string(), descending: true },
                SortKey { field: "brand".to_string(), descending: false },
            ]
        );
        assert_eq!(
            query.filters,
            vec![
                FieldFilter { field: "brand".to_string(), op: FilterOp::Eq, raw: "Toyota".to_string() },
                FieldFilter { field: "pricePerDay".to_string(), op: FilterOp::Gte, raw: "100".to_string() },
            ]
        );
    }

    #[test]
    fn test_rejects_bad_paging_and_operators() {
        assert!(ListQuery::from_params(&params(&[("page", "0")])).is_err());
        assert!(ListQuery::from_params(&params(&[("limit", "abc")])).is_err());
        assert!(ListQuery::from_params(&params(&[("year[between]", "1")])).is_err());
        assert!(ListQuery::from_params(&params(&[("year[gte", "1")])).is_err());
    }

    #[test]
    fn test_limit_is_capped() {
        let query = ListQuery::from_params(&params(&[("limit", "5000")])).unwrap();
        assert_eq!(query.limit, MAX_LIMIT);
    }

    #[test]
    fn test_condition_checks_fields_and_values() {
        let ok = ListQuery::from_params(&params(&[("year[in]", "2020,2021")])).unwrap();
        assert!(ok.condition::<car::Entity>().is_ok());

        let unknown = ListQuery::from_params(&params(&[("colour", "red")])).unwrap();
        assert!(unknown.condition::<car::Entity>().is_err());

        let bad_value = ListQuery::from_params(&params(&[("year[gt]", "recent")])).unwrap();
        assert!(bad_value.condition::<car::Entity>().is_err());
    }

    #[test]
    fn test_pagination_cursors() {
        // 23 items, 10 per page
        let first = pagination(1, 10, 23);
        assert!(first.prev.is_none());
        assert_eq!(first.next, Some(PageRef { page: 2, limit: 10 }));

        let interior = pagination(2, 10, 23);
        assert!(interior.prev.is_some() && interior.next.is_some());

        let last = pagination(3, 10, 23);
        assert!(last.next.is_none());
        assert_eq!(last.prev, Some(PageRef { page: 2, limit: 10 }));

        let exact = pagination(2, 10, 20);
        assert!(exact.next.is_none());
    }

    #[test]
    fn test_page_past_addressable_rows_is_rejected() {
        let max = u64::MAX.to_string();
        assert!(matches!(
            ListQuery::from_params(&params(&[("page", max.as_str())])),
            Err(AppError::BadRequest(_))
        ));
        assert!(ListQuery::from_params(&params(&[("page", "9223372036854775807"), ("limit", "2")])).is_err());
        assert!(ListQuery::from_params(&params(&[("page", "1000000"), ("limit", "100")])).is_ok());
    }

    #[test]
    fn test_pagination_does_not_overflow() {
        let cursors = pagination(u64::MAX, MAX_LIMIT, 10);
        assert!(cursors.next.is_none());
        assert_eq!(cursors.prev, Some(PageRef { page: u64::MAX - 1, limit: MAX_LIMIT }));
    }
}
