use anyhow::{bail, Result};
use env_logger::Env;

use sqlite_rust::executor;
use sqlite_rust::page::Pager;
use sqlite_rust::schema::{Catalog, DatabaseHeader};
use sqlite_rust::sql;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = std::env::args().collect::<Vec<_>>();
    match args.len() {
        0 | 1 => bail!("Missing <database path> and <command>"),
        2 => bail!("Missing <command>"),
        _ => {}
    }

    let path = &args[1];
    let command = &args[2];

    let header = DatabaseHeader::read(path)?;
    let pager = Pager::open_with_reserved(path, header.page_size, header.reserved_bytes_per_page)?;

    if command == ".dbinfo" {
        let catalog = Catalog::build(&pager)?;
        println!("database page size: {}", header.page_size);
        println!("number of tables: {}", catalog.count_tables());
        return Ok(());
    }

    if command == ".tables" {
        let catalog = Catalog::build(&pager)?;
        let mut line = catalog.list_tables().join(" ");
        line.push(' ');
        println!("{line}");
        return Ok(());
    }

    if command.to_lowercase().starts_with("select") {
        let catalog = Catalog::build(&pager)?;
        let plan = sql::parse_select(command)?;
        for line in executor::execute(&pager, &catalog, &plan)? {
            println!("{line}");
        }
        return Ok(());
    }

    bail!("Invalid command: {command}")
}
