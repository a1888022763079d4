#[macro_use]
extern crate log;
use env_logger::Env;
extern crate clap;
use clap::{App, Arg};
#[macro_use]
extern crate serde;

use common::catalog::Catalog;
use common::database::Database;
use common::DbError;
use compiler::{Compiler, Outcome};
use optimizer::{OptimizerConfig, STAGE_NAMES};
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::fs;

#[derive(Deserialize, Debug)]
#[serde(default)]
struct ExplainConfig {
    /// DDL script run before anything else.
    schema: Option<String>,
    join_optimization: bool,
    /// Print every snapshot instead of only the final tree.
    all_stages: bool,
    json: bool,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        ExplainConfig {
            schema: None,
            join_optimization: true,
            all_stages: true,
            json: false,
        }
    }
}

/// What the prompt loop should do after a line.
#[derive(Debug, PartialEq)]
enum Response {
    Output(String),
    Quit,
}

/// Catalog plus output settings for one run of the tool.
struct Session {
    compiler: Compiler,
    all_stages: bool,
    json: bool,
}

impl Session {
    fn new(database: Database, config: &ExplainConfig) -> Self {
        let optimizer_config = OptimizerConfig {
            join_optimization: config.join_optimization,
        };
        Session {
            compiler: Compiler::new(database, optimizer_config),
            all_stages: config.all_stages,
            json: config.json,
        }
    }

    /// Runs one SQL statement or backslash command.
    ///
    /// # Arguments
    ///
    /// * `line` - Input with the trailing `;` removed.
    fn process_input(&mut self, line: &str) -> Result<Response, DbError> {
        let line = line.trim();
        if !line.starts_with('\\') {
            let outcomes = self.compiler.run_sql(line)?;
            let mut rendered = Vec::with_capacity(outcomes.len());
            for outcome in &outcomes {
                rendered.push(self.render(outcome)?);
            }
            return Ok(Response::Output(rendered.join("\n")));
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let argument = parts.next();
        match (command, argument) {
            ("\\q", _) | ("\\quit", _) => Ok(Response::Quit),
            ("\\tables", _) => Ok(Response::Output(self.describe_tables()?)),
            ("\\i", Some(path)) => {
                info!("Running script {}", path);
                let script = fs::read_to_string(path)?;
                self.process_script(&script)
            }
            ("\\joins", Some("on")) => {
                self.compiler.set_join_optimization(true);
                Ok(Response::Output(String::from("Join optimization on")))
            }
            ("\\joins", Some("off")) => {
                self.compiler.set_join_optimization(false);
                Ok(Response::Output(String::from("Join optimization off")))
            }
            _ => Err(DbError::ValidationError(format!(
                "Unknown command {}",
                line
            ))),
        }
    }

    /// Runs a semicolon delimited script, stopping at the first error.
    fn process_script(&mut self, script: &str) -> Result<Response, DbError> {
        let mut output = Vec::new();
        for line in script.split(';') {
            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            let clean_command = command.replace('\n', " ");
            debug!("Script clean command: {}", clean_command);
            match self.process_input(&clean_command)? {
                Response::Output(s) => output.push(s),
                Response::Quit => return Ok(Response::Quit),
            }
        }
        Ok(Response::Output(output.join("\n")))
    }

    fn render(&self, outcome: &Outcome) -> Result<String, DbError> {
        let trees = match outcome {
            Outcome::TableCreated(name) => return Ok(format!("Table {} created", name)),
            Outcome::Plan(trees) => trees,
        };
        let skip = if self.all_stages {
            0
        } else {
            trees.len().saturating_sub(1)
        };
        let stages = STAGE_NAMES.iter().zip(trees.iter()).skip(skip);
        if self.json {
            let value: Vec<serde_json::Value> = stages
                .map(|(stage, tree)| serde_json::json!({ "stage": stage, "tree": tree.to_json() }))
                .collect();
            return serde_json::to_string_pretty(&value)
                .map_err(|e| DbError::DbError(e.to_string()));
        }
        let blocks: Vec<String> = stages
            .map(|(stage, tree)| format!("== {} ==\n{}\n{}", stage, tree, tree.explain()))
            .collect();
        Ok(blocks.join("\n"))
    }

    fn describe_tables(&self) -> Result<String, DbError> {
        let tables = self.compiler.database.snapshot()?;
        if tables.is_empty() {
            return Ok(String::from("No tables"));
        }
        let lines: Vec<String> = tables
            .iter()
            .map(|t| {
                let columns: Vec<String> = t
                    .schema
                    .attributes()
                    .map(|a| format!("{} {}({})", a.name(), a.dtype(), a.size))
                    .collect();
                format!("{} ({})", t.name, columns.join(", "))
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

fn print_response(result: Result<Response, DbError>) -> bool {
    match result {
        Ok(Response::Output(s)) => {
            if !s.is_empty() {
                println!("{}", s);
            }
            true
        }
        Ok(Response::Quit) => false,
        Err(e) => {
            println!("{}", e);
            true
        }
    }
}

fn process_cli_input(session: &mut Session) {
    let mut rl = Editor::<()>::new();
    if rl.load_history("history.txt").is_err() {
        info!("No previous history.");
    }
    let prompt: &str = "[explain]>>";
    loop {
        let readline = rl.readline(prompt);
        match readline {
            Ok(line) => {
                let line = line.trim().trim_end_matches(';');
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line);
                if !print_response(session.process_input(line)) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                info!("CTRL-D");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }
    if let Err(e) = rl.save_history("history.txt") {
        warn!("Could not save history: {}", e);
    }
}

fn main() {
    // Configure log environment
    env_logger::from_env(Env::default().default_filter_or("warn")).init();

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("schema")
                .short("s")
                .long("schema")
                .value_name("FILE")
                .help("Semicolon delimited CREATE TABLE statements loaded at startup")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("script")
                .short("f")
                .long("script")
                .value_name("FILE")
                .help("Takes in a semicolon delimited file of SQL statements and commands")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("no-joins")
                .long("no-joins")
                .help("Keep cartesian products instead of forming joins"),
        )
        .arg(
            Arg::with_name("final-only")
                .long("final-only")
                .help("Print only the final tree"),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Print trees as JSON"),
        )
        .get_matches();

    let mut config = if let Some(config_path) = matches.value_of("config") {
        let parsed = fs::read_to_string(config_path)
            .map_err(DbError::from)
            .and_then(|contents| {
                serde_json::from_str::<ExplainConfig>(&contents).map_err(|e| DbError::DbError(e.to_string()))
            });
        match parsed {
            Ok(c) => c,
            Err(e) => {
                error!("Could not load config {}: {}", config_path, e);
                std::process::exit(1);
            }
        }
    } else {
        ExplainConfig::default()
    };
    if let Some(schema) = matches.value_of("schema") {
        config.schema = Some(schema.to_string());
    }
    if matches.is_present("no-joins") {
        config.join_optimization = false;
    }
    if matches.is_present("final-only") {
        config.all_stages = false;
    }
    if matches.is_present("json") {
        config.json = true;
    }

    info!("Starting explain with config: {:?}", config);

    let mut session = Session::new(Database::new(String::from("explain")), &config);
    if let Some(schema_path) = &config.schema {
        let loaded = fs::read_to_string(schema_path)
            .map_err(DbError::from)
            .and_then(|schema| session.process_script(&schema));
        if let Err(e) = loaded {
            error!("Could not load schema {}: {}", schema_path, e);
            std::process::exit(1);
        }
    }

    if let Some(script_path) = matches.value_of("script") {
        let result = fs::read_to_string(script_path)
            .map_err(DbError::from)
            .and_then(|script| session.process_script(&script));
        if let Err(e) = &result {
            error!("Bad script {}: {}", script_path, e);
        }
        print_response(result);
    } else {
        process_cli_input(&mut session);
    }
    info!("Terminated.");
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::*;

    fn session(config: ExplainConfig) -> Session {
        init();
        Session::new(sample_database(), &config)
    }

    fn output(response: Response) -> String {
        match response {
            Response::Output(s) => s,
            Response::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config: ExplainConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(config.json);
        assert!(config.join_optimization);
        assert!(config.all_stages);
        assert_eq!(None, config.schema);
    }

    #[test]
    fn test_all_stages_printed() {
        let mut s = session(ExplainConfig::default());
        let out = output(
            s.process_input("SELECT FirstName FROM Customers WHERE CustomerID = 1")
                .unwrap(),
        );
        for stage in STAGE_NAMES.iter() {
            assert!(out.contains(&format!("== {} ==", stage)), "{}", stage);
        }
    }

    #[test]
    fn test_final_only_json() {
        let mut s = session(ExplainConfig {
            all_stages: false,
            json: true,
            ..ExplainConfig::default()
        });
        let out = output(
            s.process_input(
                "SELECT OrderID FROM Orders JOIN Customers ON Orders.CustomerID = Customers.CustomerID",
            )
            .unwrap(),
        );
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let stages = value.as_array().unwrap();
        assert_eq!(1, stages.len());
        assert_eq!(STAGE_NAMES[STAGE_NAMES.len() - 1], stages[0]["stage"]);
    }

    #[test]
    fn test_commands() {
        let mut s = session(ExplainConfig::default());
        assert_eq!(Response::Quit, s.process_input("\\q").unwrap());
        let tables = output(s.process_input("\\tables").unwrap());
        assert!(tables.starts_with("Customers (CustomerID NUMBER"));
        s.process_input("\\joins off").unwrap();
        assert!(!s.compiler.config.join_optimization);
        s.process_input("\\joins on").unwrap();
        assert!(s.compiler.config.join_optimization);
        assert!(s.process_input("\\joins maybe").is_err());
        assert!(s.process_input("\\i /nonexistent/script.sql").is_err());
    }

    #[test]
    fn test_script_split_on_semicolons() {
        let mut s = session(ExplainConfig {
            all_stages: false,
            ..ExplainConfig::default()
        });
        let out = output(
            s.process_script(
                "CREATE TABLE Invoices (InvoiceID INT PRIMARY KEY,\n Total INT);\n\n\
                 SELECT Total FROM Invoices WHERE Total > 10;\n",
            )
            .unwrap(),
        );
        assert!(out.starts_with("Table Invoices created"));
        assert!(s.compiler.database.is_valid_table("Invoices"));
        assert!(s.process_script("SELECT Nope FROM Invoices; \\q").is_err());
        assert_eq!(
            Response::Quit,
            s.process_script("SELECT Total FROM Invoices; \\q").unwrap()
        );
    }
}
