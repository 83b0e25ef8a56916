//! Mock database REPL binary for integration testing
//!
//! Implements the same line protocol as the `db` storage engine so the
//! harness can be tested without building it. Rows are kept in id order
//! and persisted to the database file as JSON on `.exit`.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use repl_harness::protocol::{render_rows, Row, Statement, EXECUTED, PROMPT};

fn main() {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        println!("Must supply a database filename");
        std::process::exit(1);
    };

    let mut table = match Table::open(&path) {
        Ok(table) => table,
        Err(message) => {
            println!("{}", message);
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    loop {
        write!(writer, "{}", PROMPT).ok();
        writer.flush().ok();

        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            println!("Invalid input");
            std::process::exit(1);
        }
        let line = line.trim_end_matches(['\r', '\n']);

        let response = match Statement::parse(line) {
            Ok(Statement::Exit) => {
                writer.flush().ok();
                if let Err(message) = table.close() {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
                return;
            }
            Ok(statement) => table.execute(statement),
            Err(e) => e.to_string(),
        };

        writeln!(writer, "{}", response).ok();
    }
}

/// The single table, loaded from and saved back to the database file
struct Table {
    path: PathBuf,
    rows: BTreeMap<u32, Row>,
}

impl Table {
    fn open(path: &Path) -> Result<Self, String> {
        let mut rows = BTreeMap::new();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(format!("Unable to open file: {}", e)),
        };

        if !content.trim().is_empty() {
            let stored: Vec<Row> = serde_json::from_str(&content).map_err(|_| {
                "DB file is not a whole number of rows. Corrupt file detected".to_string()
            })?;
            for row in stored {
                rows.insert(row.id, row);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    fn execute(&mut self, statement: Statement) -> String {
        match statement {
            Statement::Insert(row) => {
                if self.rows.contains_key(&row.id) {
                    return "Error: Duplicate key.".to_string();
                }
                self.rows.insert(row.id, row);
                EXECUTED.to_string()
            }
            Statement::Select => {
                let rows: Vec<Row> = self.rows.values().cloned().collect();
                render_rows(&rows)
            }
            Statement::Exit => String::new(),
        }
    }

    fn close(self) -> Result<(), String> {
        let rows: Vec<&Row> = self.rows.values().collect();
        let content = serde_json::to_string(&rows).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, content).map_err(|e| format!("Error writing: {}", e))
    }
}
