use std::env;
use std::fs::File;
use std::sync::Arc;

use custom_table_lib::TableConfig;
use custom_table_lib::TableController;
use custom_table_lib::data_source::FetchMode;
use custom_table_lib::data_source::FetchResponse;
use custom_table_lib::data_source::RequestParams;
use custom_table_lib::error::RequestError;
use custom_table_lib::export::ExportFormat;
use custom_table_lib::model::Record;
use custom_table_lib::model::Value;
use custom_table_lib::plugin::RenderArgs;
use custom_table_lib::plugin::Slot;
use custom_table_lib::selection::BatchAction;
use custom_table_lib::selection::BatchInvocation;
use custom_table_lib::selection::SelectionConfig;
use simplelog::{Config, LevelFilter, WriteLogger};

const ROWS: usize = 42;

fn dataset() -> Vec<Record> {
    (1..=ROWS)
        .map(|i| {
            let email = if i % 4 == 0 {
                Value::Null
            } else {
                Value::from(format!("user{i}@example.com"))
            };
            Record::new()
                .set("id", i)
                .set("name", format!("User {i}"))
                .set("email", email)
                .set("active", i % 3 != 0)
        })
        .collect()
}

fn page_of(rows: &[Record], params: &RequestParams, mode: FetchMode) -> FetchResponse {
    let page = params.current().unwrap_or(1).max(1);
    let size = params.page_size().unwrap_or(10).max(1);
    let start = ((page - 1) * size).min(rows.len());
    let end = (start + size).min(rows.len());
    let data = rows[start..end].to_vec();
    match mode {
        FetchMode::Paginated => FetchResponse::page(data, rows.len()),
        FetchMode::Streaming => FetchResponse::increment(data, end < rows.len()),
    }
}

fn print_slot(table: &TableController, slot: Slot) {
    for (id, node) in table.render(slot, &RenderArgs::none()) {
        let json = serde_json::to_string(&node).unwrap_or_default();
        println!("[{slot}] {id}: {json}");
    }
}

#[tokio::main]
async fn main() {
    let log_file = File::create("custom-table.log").expect("Failed to create log file");
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
        .expect("Failed to initialize logger");

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = if args.iter().any(|a| a == "--streaming") {
        FetchMode::Streaming
    } else {
        FetchMode::Paginated
    };
    let export = args
        .iter()
        .position(|a| a == "--export")
        .and_then(|i| args.get(i + 1))
        .map(|format| match format.as_str() {
            "csv" => ExportFormat::Csv,
            "json" => ExportFormat::Json,
            _ => ExportFormat::Excel,
        });

    let rows = Arc::new(dataset());
    let source = rows.clone();
    let selection = SelectionConfig::default().with_max_selection(5).with_batch_action(
        BatchAction::new("archive", "Archive", |invocation: BatchInvocation| async move {
            log::info!("archiving {} rows", invocation.keys.len());
            Ok::<_, String>(())
        }),
    );

    let table = match TableController::builder(move |params: RequestParams| {
        let response = page_of(&source, &params, mode);
        async move { Ok::<_, RequestError>(response) }
    })
    .config(TableConfig::default().with_mode(mode))
    .selection(selection)
    .with_default_plugins()
    .build()
    {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let report = table.mount().await;
    if !report.is_ok() {
        eprintln!("Some plugins failed to start: {:?}", report.activate.failures);
    }

    match mode {
        FetchMode::Paginated => {
            table.set_page(2).await;
        }
        FetchMode::Streaming => {
            table.load_more().await;
        }
    }

    table.select_all(true);
    print_slot(&table, Slot::Alert);
    print_slot(&table, Slot::Toolbar);
    print_slot(&table, Slot::Footer);
    print_slot(&table, Slot::LoadMoreButton);

    if let Err(e) = table.execute_batch_action("archive").await {
        eprintln!("Error: {}", e);
    }

    let state = table.state();
    println!(
        "page {} | {} of {} rows loaded",
        state.current(),
        state.data().len(),
        state.total()
    );
    for (index, record) in state.data().iter().take(5).enumerate() {
        let cells: Vec<String> = ["id", "name", "email"]
            .iter()
            .map(|field| {
                let cell = table.cells().render_smart_cell(record, field, index);
                cell.content.text().unwrap_or("").to_string()
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }

    if let Some(format) = export {
        match table.export_data(format) {
            Ok(file) => match std::fs::write(&file.file_name, &file.bytes) {
                Ok(()) => println!("exported {} rows to {}", file.rows, file.file_name),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    let metrics = table.get_performance_metrics();
    println!("{}", serde_json::to_string_pretty(&metrics).unwrap_or_default());
    println!(
        "{}",
        serde_json::to_string_pretty(&table.collector().report()).unwrap_or_default()
    );

    table.unmount().await;
}
