use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::storage::{display_value, ColumnInfo, Row};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub name: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
}

#[derive(Tabled)]
pub struct ColumnRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Column")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub declared_type: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            name: label.to_string(),
            rows: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn columns_table(columns: &[ColumnInfo]) -> String {
    let rows: Vec<ColumnRow> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| ColumnRow {
            position: index + 1,
            name: column.name.clone(),
            declared_type: column.declared_type.clone(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

/// Result rows with their own column headers; empty when there are no rows
pub fn rows_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    builder.push_record(first.columns().iter().cloned());
    for row in rows {
        builder.push_record(row.values().iter().map(display_value));
    }
    builder.build().with(Style::rounded()).to_string()
}
