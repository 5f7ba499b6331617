use sqlparser::ast::{
    self, Assignment, AssignmentTarget, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject,
    Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;
use crate::time;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    SelectRooms {
        active_only: bool,
    },
    InsertRoom(NewRoom),
    UpdateRoom {
        id: RoomId,
        patch: RoomPatch,
    },
    DeleteRoom {
        id: RoomId,
    },
    SelectReservations,
    InsertReservations {
        rows: Vec<NewReservation>,
    },
    UpdateReservation {
        id: ReservationId,
        patch: ReservationPatch,
    },
    DeleteReservations {
        ids: Vec<ReservationId>,
    },
    /// `DELETE ... WHERE id IN (...); INSERT ...` sent as one query.
    ReplaceReservations {
        ids: Vec<ReservationId>,
        rows: Vec<NewReservation>,
    },
}

pub const ROOM_COLUMNS: [&str; 5] = ["id", "name", "capacity", "is_active", "display_order"];

pub const RESERVATION_COLUMNS: [&str; 8] = [
    "id",
    "room_id",
    "title",
    "reserver_name",
    "reserver_team",
    "start_time",
    "end_time",
    "created_by",
];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;

    match stmts.as_slice() {
        [] => Err(SqlError::Empty),
        [single] => parse_statement(single),
        [Statement::Delete(delete), Statement::Insert(insert)] => parse_replace(delete, insert),
        _ => Err(SqlError::Unsupported(
            "multiple statements other than DELETE + INSERT on reservations".into(),
        )),
    }
}

fn parse_statement(stmt: &Statement) -> Result<Command, SqlError> {
    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(&table.relation, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_replace(delete: &ast::Delete, insert: &ast::Insert) -> Result<Command, SqlError> {
    let Command::DeleteReservations { ids } = parse_delete(delete)? else {
        return Err(SqlError::Unsupported("replace only applies to reservations".into()));
    };
    let Command::InsertReservations { rows } = parse_insert(insert)? else {
        return Err(SqlError::Unsupported("replace only applies to reservations".into()));
    };
    Ok(Command::ReplaceReservations { ids, rows })
}

// ── INSERT ────────────────────────────────────────────────────

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let columns: Vec<String> = insert.columns.iter().map(|c| c.value.to_lowercase()).collect();
    let rows = extract_all_insert_rows(insert)?;

    match table.as_str() {
        "rooms" => {
            let columns = resolve_columns(&columns, &ROOM_COLUMNS[1..])?;
            let [row] = rows.as_slice() else {
                return Err(SqlError::Unsupported("rooms are inserted one at a time".into()));
            };
            parse_room_row(&columns, row).map(Command::InsertRoom)
        }
        "reservations" => {
            let columns = resolve_columns(&columns, &RESERVATION_COLUMNS[1..])?;
            let rows = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    parse_reservation_row(&columns, row).map_err(|e| SqlError::Parse(format!("row {i}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::InsertReservations { rows })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Column list of an INSERT; the insertable columns in table order when
/// none is given. `id` is always assigned by the store.
fn resolve_columns(given: &[String], insertable: &[&'static str]) -> Result<Vec<&'static str>, SqlError> {
    if given.is_empty() {
        return Ok(insertable.to_vec());
    }
    given
        .iter()
        .map(|c| {
            if c == "id" {
                return Err(SqlError::Unsupported("id is assigned by the store".into()));
            }
            insertable
                .iter()
                .find(|known| **known == c.as_str())
                .copied()
                .ok_or_else(|| SqlError::UnknownColumn(c.clone()))
        })
        .collect()
}

fn check_arity(columns: &[&str], row: &[Expr]) -> Result<(), SqlError> {
    if columns.len() != row.len() {
        return Err(SqlError::WrongArity(columns.len(), row.len()));
    }
    Ok(())
}

fn parse_room_row(columns: &[&str], row: &[Expr]) -> Result<NewRoom, SqlError> {
    check_arity(columns, row)?;
    let mut name = None;
    let mut room = NewRoom {
        name: String::new(),
        capacity: None,
        is_active: true,
        display_order: 0,
    };
    for (col, expr) in columns.iter().zip(row) {
        match *col {
            "name" => name = Some(parse_string(expr)?),
            "capacity" => room.capacity = parse_u32_or_null(expr)?,
            "is_active" => room.is_active = parse_bool(expr)?,
            "display_order" => room.display_order = parse_i32(expr)?,
            _ => unreachable!("resolve_columns only yields room columns"),
        }
    }
    room.name = name.ok_or(SqlError::MissingColumn("name"))?;
    Ok(room)
}

fn parse_reservation_row(columns: &[&str], row: &[Expr]) -> Result<NewReservation, SqlError> {
    check_arity(columns, row)?;
    let (mut room_id, mut title, mut start, mut end) = (None, None, None, None);
    let mut reserver_name = String::new();
    let mut reserver_team = String::new();
    let mut created_by = None;
    for (col, expr) in columns.iter().zip(row) {
        match *col {
            "room_id" => room_id = Some(parse_ulid(expr)?),
            "title" => title = Some(parse_string(expr)?),
            "reserver_name" => reserver_name = parse_string(expr)?,
            "reserver_team" => reserver_team = parse_string(expr)?,
            "start_time" => start = Some(parse_instant(expr)?),
            "end_time" => end = Some(parse_instant(expr)?),
            "created_by" => created_by = parse_string_or_null(expr)?,
            _ => unreachable!("resolve_columns only yields reservation columns"),
        }
    }
    Ok(NewReservation {
        room_id: room_id.ok_or(SqlError::MissingColumn("room_id"))?,
        title: title.ok_or(SqlError::MissingColumn("title"))?,
        reserver_name,
        reserver_team,
        start: start.ok_or(SqlError::MissingColumn("start_time"))?,
        end: end.ok_or(SqlError::MissingColumn("end_time"))?,
        created_by,
    })
}

// ── UPDATE / DELETE ───────────────────────────────────────────

fn assignment_column(a: &Assignment) -> Result<String, SqlError> {
    match &a.target {
        AssignmentTarget::ColumnName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))
        }
        AssignmentTarget::Tuple(_) => Err(SqlError::Unsupported("tuple assignment".into())),
    }
}

fn parse_update(relation: &TableFactor, assignments: &[Assignment], selection: &Option<Expr>) -> Result<Command, SqlError> {
    let table = table_factor_name(relation)?;
    let id = extract_where_id(selection)?;

    match table.as_str() {
        "rooms" => {
            let mut patch = RoomPatch::default();
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "name" => patch.name = Some(parse_string(&a.value)?),
                    "capacity" => patch.capacity = Some(parse_u32_or_null(&a.value)?),
                    "is_active" => patch.is_active = Some(parse_bool(&a.value)?),
                    "display_order" => patch.display_order = Some(parse_i32(&a.value)?),
                    other => return Err(SqlError::UnknownColumn(other.into())),
                }
            }
            Ok(Command::UpdateRoom { id, patch })
        }
        "reservations" => {
            let mut patch = ReservationPatch::default();
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "room_id" => patch.room_id = Some(parse_ulid(&a.value)?),
                    "title" => patch.title = Some(parse_string(&a.value)?),
                    "reserver_name" => patch.reserver_name = Some(parse_string(&a.value)?),
                    "reserver_team" => patch.reserver_team = Some(parse_string(&a.value)?),
                    "start_time" => patch.start = Some(parse_instant(&a.value)?),
                    "end_time" => patch.end = Some(parse_instant(&a.value)?),
                    "created_by" => patch.created_by = Some(parse_string_or_null(&a.value)?),
                    other => return Err(SqlError::UnknownColumn(other.into())),
                }
            }
            Ok(Command::UpdateReservation { id, patch })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    match table.as_str() {
        "rooms" => Ok(Command::DeleteRoom {
            id: extract_where_id(&delete.selection)?,
        }),
        "reservations" => Ok(Command::DeleteReservations {
            ids: extract_where_ids(&delete.selection)?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

/// ORDER BY is accepted and ignored: rows always come back in the
/// table's canonical order.
fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };
    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "rooms" => {
            let active_only = match &select.selection {
                None => false,
                Some(Expr::BinaryOp {
                    left,
                    op: ast::BinaryOperator::Eq,
                    right,
                }) if expr_column_name(left).as_deref() == Some("is_active") => parse_bool(right)?,
                Some(other) => return Err(SqlError::Unsupported(format!("rooms filter {other}"))),
            };
            Ok(Command::SelectRooms { active_only })
        }
        "reservations" => {
            if let Some(filter) = &select.selection {
                return Err(SqlError::Unsupported(format!("reservations filter {filter}")));
            }
            Ok(Command::SelectReservations)
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    match tables_with_joins.first() {
        Some(first) => table_factor_name(&first.relation),
        None => Err(SqlError::Parse("DELETE without table".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_all_insert_rows(insert: &ast::Insert) -> Result<Vec<Vec<Expr>>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) if !values.rows.is_empty() => Ok(values.rows.clone()),
        SetExpr::Values(_) => Err(SqlError::Parse("empty VALUES".into())),
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    match selection.as_ref() {
        Some(Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        }) if expr_column_name(left).as_deref() == Some("id") => parse_ulid(right),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

/// `id = '…'` or `id IN ('…', …)`.
fn extract_where_ids(selection: &Option<Expr>) -> Result<Vec<Ulid>, SqlError> {
    match selection.as_ref() {
        Some(Expr::InList {
            expr,
            list,
            negated: false,
        }) if expr_column_name(expr).as_deref() == Some("id") => list.iter().map(parse_ulid).collect(),
        _ => extract_where_id(selection).map(|id| vec![id]),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn expect_value(expr: &Expr) -> Result<&Value, SqlError> {
    extract_value(expr).ok_or_else(|| SqlError::Parse(format!("expected value, got {expr}")))
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    match expect_value(expr)? {
        Value::SingleQuotedString(s) => Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID {s:?}: {e}"))),
        other => Err(SqlError::Parse(format!("expected ULID string, got {other}"))),
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match expect_value(expr)? {
        Value::SingleQuotedString(s) | Value::EscapedStringLiteral(s) => Ok(s.clone()),
        other => Err(SqlError::Parse(format!("expected string, got {other}"))),
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match expect_value(expr)? {
        Value::Null => Ok(None),
        _ => parse_string(expr).map(Some),
    }
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        return Ok(-parse_i64(expr)?);
    }
    match expect_value(expr)? {
        Value::Number(s, _) | Value::SingleQuotedString(s) => {
            s.parse().map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}")))
        }
        other => Err(SqlError::Parse(format!("expected number, got {other}"))),
    }
}

fn parse_i32(expr: &Expr) -> Result<i32, SqlError> {
    let v = parse_i64(expr)?;
    i32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of i32 range")))
}

fn parse_u32_or_null(expr: &Expr) -> Result<Option<u32>, SqlError> {
    if matches!(extract_value(expr), Some(Value::Null)) {
        return Ok(None);
    }
    let v = parse_i64(expr)?;
    u32::try_from(v)
        .map(Some)
        .map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    match expect_value(expr)? {
        Value::Boolean(b) => Ok(*b),
        Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
        },
        Value::Number(n, _) => Ok(n != "0"),
        other => Err(SqlError::Parse(format!("expected bool, got {other}"))),
    }
}

/// ISO-8601 string with offset, or raw Unix milliseconds.
fn parse_instant(expr: &Expr) -> Result<Ms, SqlError> {
    match expect_value(expr)? {
        Value::SingleQuotedString(s) => time::parse_iso(s).map_err(|e| SqlError::Parse(e.to_string())),
        Value::Number(..) => parse_i64(expr),
        other => Err(SqlError::Parse(format!("expected timestamp, got {other}"))),
    }
}

// ── Rendering (client side) ───────────────────────────────────

/// Single-quoted SQL literal.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_opt(s: Option<&str>) -> String {
    s.map_or_else(|| "NULL".to_string(), quote)
}

fn render_ids(ids: &[Ulid]) -> String {
    ids.iter().map(|id| quote(&id.to_string())).collect::<Vec<_>>().join(", ")
}

pub fn render_insert_room(room: &NewRoom) -> String {
    format!(
        "INSERT INTO rooms (name, capacity, is_active, display_order) VALUES ({}, {}, {}, {})",
        quote(&room.name),
        room.capacity.map_or_else(|| "NULL".to_string(), |c| c.to_string()),
        room.is_active,
        room.display_order
    )
}

/// `None` for an empty patch: there is nothing to send.
pub fn render_update_room(id: RoomId, patch: &RoomPatch) -> Option<String> {
    let mut sets = Vec::new();
    if let Some(name) = &patch.name {
        sets.push(format!("name = {}", quote(name)));
    }
    if let Some(capacity) = patch.capacity {
        sets.push(format!(
            "capacity = {}",
            capacity.map_or_else(|| "NULL".to_string(), |c| c.to_string())
        ));
    }
    if let Some(active) = patch.is_active {
        sets.push(format!("is_active = {active}"));
    }
    if let Some(order) = patch.display_order {
        sets.push(format!("display_order = {order}"));
    }
    (!sets.is_empty()).then(|| format!("UPDATE rooms SET {} WHERE id = {}", sets.join(", "), quote(&id.to_string())))
}

pub fn render_insert_reservations(rows: &[NewReservation]) -> String {
    let values: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "({}, {}, {}, {}, {}, {}, {})",
                quote(&r.room_id.to_string()),
                quote(&r.title),
                quote(&r.reserver_name),
                quote(&r.reserver_team),
                quote(&time::format_iso(r.start)),
                quote(&time::format_iso(r.end)),
                quote_opt(r.created_by.as_deref())
            )
        })
        .collect();
    format!(
        "INSERT INTO reservations (room_id, title, reserver_name, reserver_team, start_time, end_time, created_by) VALUES {}",
        values.join(", ")
    )
}

pub fn render_update_reservation(id: ReservationId, patch: &ReservationPatch) -> Option<String> {
    let mut sets = Vec::new();
    if let Some(room_id) = patch.room_id {
        sets.push(format!("room_id = {}", quote(&room_id.to_string())));
    }
    for (col, value) in [
        ("title", &patch.title),
        ("reserver_name", &patch.reserver_name),
        ("reserver_team", &patch.reserver_team),
    ] {
        if let Some(v) = value {
            sets.push(format!("{col} = {}", quote(v)));
        }
    }
    if let Some(start) = patch.start {
        sets.push(format!("start_time = {}", quote(&time::format_iso(start))));
    }
    if let Some(end) = patch.end {
        sets.push(format!("end_time = {}", quote(&time::format_iso(end))));
    }
    if let Some(created_by) = &patch.created_by {
        sets.push(format!("created_by = {}", quote_opt(created_by.as_deref())));
    }
    (!sets.is_empty()).then(|| {
        format!(
            "UPDATE reservations SET {} WHERE id = {}",
            sets.join(", "),
            quote(&id.to_string())
        )
    })
}

pub fn render_delete_reservations(ids: &[ReservationId]) -> String {
    format!("DELETE FROM reservations WHERE id IN ({})", render_ids(ids))
}

pub fn render_replace_reservations(ids: &[ReservationId], rows: &[NewReservation]) -> String {
    format!(
        "{}; {}",
        render_delete_reservations(ids),
        render_insert_reservations(rows)
    )
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    MissingColumn(&'static str),
    /// Columns named vs values supplied.
    WrongArity(usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::MissingColumn(c) => write!(f, "missing column: {c}"),
            SqlError::WrongArity(expected, got) => {
                write!(f, "expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
