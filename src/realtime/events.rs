use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Agent, Booking, CustomerType, Expense, Tour};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Tours,
    Agents,
    CustomerTypes,
    Bookings,
    Expenses,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Tours,
        Table::Agents,
        Table::CustomerTypes,
        Table::Bookings,
        Table::Expenses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Tours => "tours",
            Table::Agents => "agents",
            Table::CustomerTypes => "customer_types",
            Table::Bookings => "bookings",
            Table::Expenses => "expenses",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table `{s}`"))
    }
}

/// Одна строка любой из таблиц.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum Record {
    Tour(Tour),
    Agent(Agent),
    CustomerType(CustomerType),
    Booking(Booking),
    Expense(Expense),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Tour(_) => Table::Tours,
            Record::Agent(_) => Table::Agents,
            Record::CustomerType(_) => Table::CustomerTypes,
            Record::Booking(_) => Table::Bookings,
            Record::Expense(_) => Table::Expenses,
        }
    }
}

/// Справочник, замененный целиком.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "rows", rename_all = "snake_case")]
pub enum RecordSet {
    Agents(Vec<Agent>),
    CustomerTypes(Vec<CustomerType>),
}

/// Изменение в хранилище, привязанное к конкретной таблице.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    Upserted { record: Record },
    Deleted { table: Table, key: String },
    Replaced { records: RecordSet },
    /// Тур переименован; брони и расходы уже перенесены в хранилище.
    TourRenamed { from: String, tour: Tour },
    /// Неизвестное изменение: нужна полная пересинхронизация.
    Invalidated,
}

impl ChangeEvent {
    pub fn upserted(record: Record) -> Self {
        ChangeEvent::Upserted { record }
    }

    pub fn deleted(table: Table, key: impl Into<String>) -> Self {
        ChangeEvent::Deleted { table, key: key.into() }
    }

    /// Таблицы, которых касается изменение. Пустой список означает "все".
    pub fn tables(&self) -> Vec<Table> {
        match self {
            ChangeEvent::Upserted { record } => vec![record.table()],
            ChangeEvent::Deleted { table, .. } => vec![*table],
            ChangeEvent::Replaced { records: RecordSet::Agents(_) } => vec![Table::Agents],
            ChangeEvent::Replaced { records: RecordSet::CustomerTypes(_) } => vec![Table::CustomerTypes],
            ChangeEvent::TourRenamed { .. } => vec![Table::Tours, Table::Bookings, Table::Expenses],
            ChangeEvent::Invalidated => Vec::new(),
        }
    }

    pub fn touches(&self, table: Table) -> bool {
        let tables = self.tables();
        tables.is_empty() || tables.contains(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_tagged() {
        let event = ChangeEvent::deleted(Table::Bookings, "42");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert_eq!(json["table"], "bookings");
        assert_eq!(json["key"], "42");

        let ct = ChangeEvent::upserted(Record::CustomerType(CustomerType { label: "VIP".into(), fee: 1500 }));
        let json = serde_json::to_value(&ct).unwrap();
        assert_eq!(json["kind"], "upserted");
        assert_eq!(json["record"]["table"], "customer_type");
        assert_eq!(json["record"]["row"]["fee"], 1500);
    }

    #[test]
    fn scoping_by_table() {
        let renamed = ChangeEvent::TourRenamed {
            from: "Old".into(),
            tour: Tour { name: "New".into(), fee: 1, departure: None, created_at: chrono::Utc::now() },
        };
        assert!(renamed.touches(Table::Bookings));
        assert!(!renamed.touches(Table::Agents));
        assert!(ChangeEvent::Invalidated.touches(Table::Agents));
        assert!(!ChangeEvent::deleted(Table::Expenses, "x").touches(Table::Tours));
    }

    #[test]
    fn table_names_parse() {
        for t in Table::ALL {
            assert_eq!(t.as_str().parse::<Table>().unwrap(), t);
        }
        assert!("payments".parse::<Table>().is_err());
    }
}
