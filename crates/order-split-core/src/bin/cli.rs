use chrono::Local;
use order_split::catalog::join_eligibility;
use order_split::validation::validate_item_draft;
use order_split::{
    AllocationWarning, AppConfig, CatalogStore, ContractDraft, ItemDraft, Money, OrderSession,
    SqliteCatalogStore, TransferRequest, import_catalog, load_catalog_from_json, logging,
    save_catalog_to_json, save_export_to_json, write_sheets_to_csv,
};
use polars::prelude::*;
use std::io::{self, Write};

fn format_cell(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::Float64(v) => format!("{v:.2}"),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Boolean(b) => if *b { "sim" } else { "não" }.to_string(),
        other => other.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    for (ci, col) in columns.iter().enumerate() {
        for row_idx in 0..df.height() {
            if let Ok(ref av) = col.get(row_idx) {
                widths[ci] = widths[ci].max(format_cell(av).chars().count());
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let push_row = |out: &mut String, cells: &[String]| {
        out.push('|');
        for (ci, s) in cells.iter().enumerate() {
            out.push(' ');
            out.push_str(s);
            out.push_str(&" ".repeat(widths[ci].saturating_sub(s.chars().count())));
            out.push_str(" |");
        }
        out.push('\n');
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &col_names);
    out.push_str(&sep);
    out.push('\n');
    for row_idx in 0..df.height() {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| col.get(row_idx).map(|av| format_cell(&av)).unwrap_or_default())
            .collect();
        push_row(&mut out, &cells);
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn resources_frame(session: &OrderSession) -> PolarsResult<DataFrame> {
    let resources = session.registry().resources();
    let ids: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();
    let names: Vec<String> = resources.iter().map(|r| r.name.clone()).collect();
    let priority: Vec<bool> = resources.iter().map(|r| r.priority).collect();
    let selected: Vec<bool> = resources
        .iter()
        .map(|r| session.staging().is_selected(&r.id))
        .collect();
    df!(
        "id" => ids,
        "nome" => names,
        "prioritário" => priority,
        "selecionado" => selected
    )
}

fn contracts_frame(session: &OrderSession) -> PolarsResult<DataFrame> {
    let contracts = session.contracts();
    let ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();
    let names: Vec<String> = contracts.iter().map(|c| c.name.clone()).collect();
    let item_counts: Vec<i64> = contracts.iter().map(|c| c.items.len() as i64).collect();
    df!(
        "id" => ids,
        "nome" => names,
        "itens" => item_counts
    )
}

fn items_frame(session: &OrderSession, contract_id: i64) -> Option<PolarsResult<DataFrame>> {
    let contract = session.contracts().iter().find(|c| c.id == contract_id)?;
    let staged = session
        .selected_contract()
        .filter(|selected| selected.id == contract_id)
        .map(|_| session.staging());
    let items = &contract.items;
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
    let units: Vec<String> = items.iter().map(|i| i.unit.clone()).collect();
    let prices: Vec<f64> = items.iter().map(|i| i.unit_price.as_f64()).collect();
    let eligible: Vec<String> = items
        .iter()
        .map(|i| join_eligibility(&i.eligible_resources))
        .collect();
    let quantities: Vec<Option<i64>> = items
        .iter()
        .map(|item| {
            staged
                .and_then(|s| s.quantity_of(item.id))
                .map(|q| i64::try_from(q).unwrap_or(i64::MAX))
        })
        .collect();
    Some(df!(
        "id" => ids,
        "nome" => names,
        "unidade" => units,
        "valor" => prices,
        "recursos" => eligible,
        "quantidade" => quantities
    ))
}

fn print_frame(frame: PolarsResult<DataFrame>) {
    match frame {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Table error: {}", e),
    }
}

fn print_allocation(session: &OrderSession) {
    let bundle = match session.export(Local::now().date_naive(), true) {
        Ok(bundle) => bundle,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    for sheet in bundle.all_sheets() {
        println!("{}", sheet.title);
        print_frame(sheet.to_dataframe());
    }
}

fn print_warnings(warnings: &[AllocationWarning]) {
    for warning in warnings {
        match warning {
            AllocationWarning::NoEligibleResource {
                item_name,
                quantity,
                ..
            } => println!(
                "Skipped '{}' ({} units): no selected resource is eligible",
                item_name, quantity
            ),
            AllocationWarning::UnknownItem { item_id, quantity } => println!(
                "Skipped item {} ({} units): not part of the contract",
                item_id, quantity
            ),
        }
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                                  Show this help\n  resources                             List resources and the current selection\n  contracts                             Reload and list contracts\n  items <contract_id>                   List the items of a contract\n  contract new <name...>                Create an empty contract\n  contract delete <id>                  Delete a contract and its items\n  item add <contract_id> <price> <unit> <resources_csv> <name...>\n                                        Add an item (resources like saude,educacao)\n  select <contract_id>                  Stage a contract (quantities reset to 0)\n  qty <item_id> <quantity>              Set the staged quantity of an item\n  resource toggle <id>                  Add or remove a resource from the selection\n  resource all|none                     Select every resource / clear the selection\n  compute                               Split the staged order\n  show                                  Show the current allocation\n  transfer <item_id> <qty> <from> <to>  Move units between resources\n  export csv <dir>                      Write one CSV per resource sheet\n  export json <path>                    Write the whole export as JSON\n  catalog save <path>                   Save every contract to a JSON file\n  catalog load <path>                   Import contracts from a JSON file\n  quit|exit                             Exit"
    );
}

fn parse_or_report<T: std::str::FromStr>(value: Option<&str>, what: &str) -> Option<T> {
    match value.map(str::parse::<T>) {
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => {
            println!("Invalid {}", what);
            None
        }
        None => None,
    }
}

fn rest_of_line<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn main() {
    logging::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let store = match SqliteCatalogStore::new(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!(
                "Cannot open database {}: {}",
                config.database_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let mut session = OrderSession::from_config(&config);
    if let Err(e) = session.reload_contracts(&store) {
        println!("Could not load contracts: {}", e);
    }

    println!("Order Split (CLI) - type 'help' for commands\n");
    print_frame(contracts_frame(&session));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "resources" => print_frame(resources_frame(&session)),
            "contracts" => match session.reload_contracts(&store) {
                Ok(_) => print_frame(contracts_frame(&session)),
                Err(e) => println!("Error loading contracts: {}", e),
            },
            "items" => match parse_or_report::<i64>(parts.next(), "contract id") {
                Some(id) => match items_frame(&session, id) {
                    Some(frame) => print_frame(frame),
                    None => println!("Contract {} not found.", id),
                },
                None => println!("Usage: items <contract_id>"),
            },
            "contract" => match parts.next() {
                Some("new") => {
                    let name = rest_of_line(parts);
                    if name.is_empty() {
                        println!("Usage: contract new <name...>");
                        continue;
                    }
                    match session.create_contract(&store, &ContractDraft::new(name)) {
                        Ok(id) => println!("Contract {} created.", id),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Some("delete") => match parse_or_report::<i64>(parts.next(), "contract id") {
                    Some(id) => match session.delete_contract(&store, id) {
                        Ok(()) => println!("Deleted contract {}.", id),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: contract delete <id>"),
                },
                _ => println!("Usage: contract new <name...> | contract delete <id>"),
            },
            "item" => {
                if parts.next() != Some("add") {
                    println!("Usage: item add <contract_id> <price> <unit> <resources_csv> <name...>");
                    continue;
                }
                let contract_id = parse_or_report::<i64>(parts.next(), "contract id");
                let price = parse_or_report::<Money>(parts.next(), "price");
                let unit = parts.next();
                let resources = parts.next();
                let name = rest_of_line(parts);
                let (Some(contract_id), Some(price), Some(unit), Some(resources)) =
                    (contract_id, price, unit, resources)
                else {
                    println!("Usage: item add <contract_id> <price> <unit> <resources_csv> <name...>");
                    continue;
                };
                let draft = ItemDraft::new(name, unit, price)
                    .with_eligible(resources.split(',').map(str::trim));
                if let Err(e) = validate_item_draft(&draft, Some(session.registry())) {
                    println!("Error: {}", e);
                    continue;
                }
                match store.create_item(contract_id, &draft) {
                    Ok(id) => {
                        println!("Item {} added.", id);
                        if let Err(e) = session.reload_contracts(&store) {
                            println!("Error loading contracts: {}", e);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "select" => match parse_or_report::<i64>(parts.next(), "contract id") {
                Some(id) => match session.select_contract(id) {
                    Ok(contract) => {
                        println!("Selected '{}'.", contract.name);
                        if let Some(frame) = items_frame(&session, id) {
                            print_frame(frame);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: select <contract_id>"),
            },
            "qty" => {
                let item_id = parse_or_report::<i64>(parts.next(), "item id");
                let quantity = parse_or_report::<u64>(parts.next(), "quantity");
                match (item_id, quantity) {
                    (Some(item_id), Some(quantity)) => {
                        match session.set_quantity(item_id, quantity) {
                            Ok(()) => println!("Quantity set."),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: qty <item_id> <quantity>"),
                }
            }
            "resource" => match (parts.next(), parts.next()) {
                (Some("toggle"), Some(id)) => match session.toggle_resource(id) {
                    Ok(true) => println!("'{}' selected.", id),
                    Ok(false) => println!("'{}' removed from the selection.", id),
                    Err(e) => println!("Error: {}", e),
                },
                (Some("all"), None) => {
                    session.select_all_resources();
                    print_frame(resources_frame(&session));
                }
                (Some("none"), None) => {
                    session.clear_resources();
                    println!("Selection cleared.");
                }
                _ => println!("Usage: resource toggle <id> | resource all | resource none"),
            },
            "compute" => {
                let outcome = session.compute();
                match (&outcome.result, outcome.empty_reason) {
                    (Some(result), _) => {
                        print_warnings(&outcome.warnings);
                        println!("Computed: {} resources, total {}", result.len(), result.total_value());
                        print_allocation(&session);
                    }
                    (None, Some(reason)) => println!("Nothing to compute: {}", reason.message()),
                    (None, None) => println!("Nothing to compute."),
                }
            }
            "show" => print_allocation(&session),
            "transfer" => {
                let item_id = parse_or_report::<i64>(parts.next(), "item id");
                let quantity = parse_or_report::<i64>(parts.next(), "quantity");
                match (item_id, quantity, parts.next(), parts.next()) {
                    (Some(item_id), Some(quantity), Some(from), Some(to)) => {
                        let request = TransferRequest::new(item_id, quantity, from, to);
                        match session.transfer(&request) {
                            Ok(_) => {
                                println!("Transferred.");
                                print_allocation(&session);
                            }
                            Err(e) => println!("Transfer rejected: {}", e),
                        }
                    }
                    _ => println!("Usage: transfer <item_id> <qty> <from> <to>"),
                }
            }
            "export" => {
                let kind = parts.next();
                let path = parts.next();
                let (Some(kind), Some(path)) = (kind, path) else {
                    println!("Usage: export <csv|json> <path>");
                    continue;
                };
                let bundle = match session.export(Local::now().date_naive(), true) {
                    Ok(bundle) => bundle,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                match kind {
                    "csv" => match write_sheets_to_csv(path, &bundle) {
                        Ok(paths) => {
                            for p in paths {
                                println!("Wrote {}", p.display());
                            }
                        }
                        Err(e) => println!("Export error: {}", e),
                    },
                    "json" => match save_export_to_json(&bundle, path) {
                        Ok(()) => println!("Wrote {} ({})", path, bundle.file_name("json")),
                        Err(e) => println!("Export error: {}", e),
                    },
                    _ => println!("Usage: export <csv|json> <path>"),
                }
            }
            "catalog" => match (parts.next(), parts.next()) {
                (Some("save"), Some(path)) => match save_catalog_to_json(&store, path) {
                    Ok(()) => println!("Catalog saved to {}.", path),
                    Err(e) => println!("Error: {}", e),
                },
                (Some("load"), Some(path)) => {
                    match load_catalog_from_json(path)
                        .and_then(|drafts| import_catalog(&store, &drafts))
                    {
                        Ok(created) => {
                            println!("Imported {} contracts.", created.len());
                            if let Err(e) = session.reload_contracts(&store) {
                                println!("Error loading contracts: {}", e);
                            }
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: catalog <save|load> <path>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
