use chrono::{NaiveDate, NaiveDateTime};
use forecast_tool::{
    Schedule, TimeMapConfig,
    load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json,
    timemap::TimeMap,
};
use polars::prelude::{AnyValue, DataFrame};
use std::fs;
use std::io::{self, Write};

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn hours_to_minutes(s: &str) -> Option<i64> {
    let hours: f64 = s.parse().ok()?;
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    Some((hours * 60.0).round() as i64)
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let cell = |av: &AnyValue| -> String {
        match av {
            AnyValue::Null => String::new(),
            AnyValue::Int32(v) => v.to_string(),
            AnyValue::Int64(v) => v.to_string(),
            AnyValue::Boolean(v) => v.to_string(),
            AnyValue::String(s) => s.to_string(),
            _ => av.to_string(),
        }
    };

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for (ci, col) in columns.iter().enumerate() {
        for row_idx in 0..df.height() {
            if let Ok(ref av) = col.get(row_idx) {
                let s = cell(av);
                if s.len() > widths[ci] {
                    widths[ci] = s.len();
                }
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');

    out.push('|');
    for (i, name) in col_names.iter().enumerate() {
        out.push(' ');
        out.push_str(name);
        let pad = widths[i] - name.len();
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');

    for row_idx in 0..df.height() {
        out.push('|');
        for (ci, col) in columns.iter().enumerate() {
            let s = col.get(row_idx).map(|av| cell(&av)).unwrap_or_default();
            out.push(' ');
            out.push_str(&s);
            let pad = widths[ci].saturating_sub(s.len());
            if pad > 0 {
                out.push_str(&" ".repeat(pad));
            }
            out.push(' ');
            out.push('|');
        }
        out.push('\n');
    }

    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show current schedule\n  new                                Append empty task with next id\n  add <id> <hours> <desc...>         Upsert a task with an effort estimate\n  delete <id>                        Delete a task\n  rank  <id> <i32>                   Set priority rank (lower runs first)\n  due   <id> <dt|none>               Set due date (YYYY-MM-DDTHH:MM)\n  wait  <id> <dt|none>               Do not schedule before this instant\n  chunk <id> <hours>                 Set the task's min block size\n  map   <id> <name|none>             Assign an availability time map\n  timemap set <name> <json_path>     Load a time map definition from JSON\n  timemap del <name>                 Remove a time map\n  timemap list                       List time map names\n  calendar block <start> <end>       Add a blocking interval (datetimes)\n  calendar allday <YYYY-MM-DD>       Block a whole day\n  calendar clear                     Remove all blocks\n  calendar show                      Show blocking intervals\n  config show                        Show scheduler configuration\n  config algorithm <seq|par>         sequential | parallel\n  config horizon <days>              Days ahead to search\n  config chunk <hours>               Default min block for new tasks\n  forecast [<dt>]                    Run the forecast (optionally from a\n                                     fixed instant for reproducible output)\n  save <json|csv> <path>             Persist schedule to disk\n  load <json|csv> <path>             Load schedule from disk\n  quit|exit                          Exit"
    );
}

fn print_config(schedule: &Schedule) {
    let config = schedule.config();
    println!("Algorithm          : {}", config.algorithm);
    println!("Horizon (days)     : {}", config.days_ahead);
    println!(
        "Default min block  : {:.2} hours",
        config.default_min_block_minutes as f64 / 60.0
    );
}

fn print_calendar(schedule: &Schedule) {
    let blocks = schedule.calendar().blocks();
    if blocks.is_empty() {
        println!("No blocking intervals.");
        return;
    }
    for block in blocks {
        println!(
            "{} .. {}",
            block.start.format("%Y-%m-%d %H:%M"),
            block.end.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_late_tasks(schedule: &Schedule) {
    let tasks = match schedule.tasks() {
        Ok(tasks) => tasks,
        Err(_) => return,
    };
    for task in tasks {
        if task.is_late == Some(true) {
            // bold red
            println!(
                "\x1b[1;31mTask {} ('{}') may not be completed on time\x1b[0m",
                task.id, task.description
            );
        }
    }
}

fn next_id(schedule: &Schedule) -> i32 {
    if schedule.dataframe().height() == 0 {
        return 1;
    }
    schedule
        .dataframe()
        .column("id")
        .ok()
        .and_then(|s| s.i32().ok())
        .and_then(|ca| ca.into_iter().flatten().max())
        .map(|m| m + 1)
        .unwrap_or(1)
}

fn main() {
    let mut schedule = Schedule::new();

    println!("Forecast Tool (CLI) - type 'help' for commands\n");
    println!("{}", render_df_as_text_table(schedule.dataframe()));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        if stdin.read_line(&mut line).is_err() {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or_default();
        match command {
            "help" => print_help(),
            "show" => println!("{}", render_df_as_text_table(schedule.dataframe())),
            "new" => {
                let id = next_id(&schedule);
                match schedule.upsert_task(id, "", 0, None) {
                    Ok(()) => println!("Added empty task {id}."),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "add" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let minutes = parts.next().and_then(hours_to_minutes);
                let description = parts.collect::<Vec<_>>().join(" ");
                match (id, minutes) {
                    (Some(id), Some(minutes)) => {
                        match schedule.upsert_task(id, &description, minutes, None) {
                            Ok(()) => println!("Upserted task {id}."),
                            Err(err) => println!("Error: {err}"),
                        }
                    }
                    _ => println!("Usage: add <id> <hours> <desc...>"),
                }
            }
            "delete" => match parts.next().and_then(|s| s.parse::<i32>().ok()) {
                Some(id) => match schedule.delete_task(id) {
                    Ok(true) => println!("Deleted task {id}."),
                    Ok(false) => println!("Task {id} not found."),
                    Err(err) => println!("Error: {err}"),
                },
                None => println!("Usage: delete <id>"),
            },
            "rank" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let rank = parts.next().and_then(|s| s.parse::<i32>().ok());
                match (id, rank) {
                    (Some(id), Some(rank)) => match schedule.set_priority_rank(id, rank) {
                        Ok(()) => println!("Set rank of task {id} to {rank}."),
                        Err(err) => println!("Error: {err}"),
                    },
                    _ => println!("Usage: rank <id> <i32>"),
                }
            }
            "due" | "wait" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let value = parts.next();
                let (Some(id), Some(value)) = (id, value) else {
                    println!("Usage: {command} <id> <YYYY-MM-DDTHH:MM|none>");
                    continue;
                };
                let instant = if value == "none" {
                    None
                } else {
                    match parse_datetime(value) {
                        Some(dt) => Some(dt),
                        None => {
                            println!("Invalid datetime '{value}'.");
                            continue;
                        }
                    }
                };
                let result = if command == "due" {
                    schedule.set_due(id, instant)
                } else {
                    schedule.set_wait(id, instant)
                };
                match result {
                    Ok(()) => println!("Set {command} of task {id}."),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "chunk" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let minutes = parts.next().and_then(hours_to_minutes);
                match (id, minutes) {
                    (Some(id), Some(minutes)) => match schedule.set_min_block(id, minutes) {
                        Ok(()) => println!("Set min block of task {id}."),
                        Err(err) => println!("Error: {err}"),
                    },
                    _ => println!("Usage: chunk <id> <hours>"),
                }
            }
            "map" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let name = parts.next();
                match (id, name) {
                    (Some(id), Some(name)) => {
                        let value = if name == "none" {
                            None
                        } else {
                            Some(name.to_string())
                        };
                        match schedule.set_task_time_map(id, value) {
                            Ok(()) => println!("Assigned time map for task {id}."),
                            Err(err) => println!("Error: {err}"),
                        }
                    }
                    _ => println!("Usage: map <id> <name|none>"),
                }
            }
            "timemap" => match parts.next() {
                Some("set") => {
                    let name = parts.next();
                    let path = parts.next();
                    let (Some(name), Some(path)) = (name, path) else {
                        println!("Usage: timemap set <name> <json_path>");
                        continue;
                    };
                    let contents = match fs::read_to_string(path) {
                        Ok(contents) => contents,
                        Err(err) => {
                            println!("Error reading {path}: {err}");
                            continue;
                        }
                    };
                    let config: TimeMapConfig = match serde_json::from_str(&contents) {
                        Ok(config) => config,
                        Err(err) => {
                            println!("Invalid time map JSON: {err}");
                            continue;
                        }
                    };
                    match TimeMap::from_config(name, &config) {
                        Ok(map) => {
                            schedule.set_time_map(name.to_string(), map);
                            println!("Time map '{name}' loaded.");
                        }
                        Err(err) => println!("Error: {err}"),
                    }
                }
                Some("del") => match parts.next() {
                    Some(name) => {
                        if schedule.remove_time_map(name) {
                            println!("Removed time map '{name}'.");
                        } else {
                            println!("Time map '{name}' not found.");
                        }
                    }
                    None => println!("Usage: timemap del <name>"),
                },
                Some("list") => {
                    let names = schedule.time_maps().names();
                    if names.is_empty() {
                        println!("No time maps defined.");
                    } else {
                        for name in names {
                            println!("{name}");
                        }
                    }
                }
                _ => println!("Usage: timemap <set|del|list> ..."),
            },
            "calendar" => match parts.next() {
                Some("block") => {
                    let start = parts.next().and_then(parse_datetime);
                    let end = parts.next().and_then(parse_datetime);
                    match (start, end) {
                        (Some(start), Some(end)) if start < end => {
                            schedule.add_block(start, end);
                            println!("Block added.");
                        }
                        _ => println!("Usage: calendar block <start> <end> (start < end)"),
                    }
                }
                Some("allday") => match parts.next().and_then(parse_date) {
                    Some(date) => {
                        schedule.add_all_day_block(date);
                        println!("Blocked {date} entirely.");
                    }
                    None => println!("Usage: calendar allday <YYYY-MM-DD>"),
                },
                Some("clear") => {
                    schedule.clear_blocks();
                    println!("Calendar cleared.");
                }
                Some("show") => print_calendar(&schedule),
                _ => println!("Usage: calendar <block|allday|clear|show> ..."),
            },
            "config" => match parts.next() {
                Some("show") => print_config(&schedule),
                Some("algorithm") => {
                    let value = parts.next().unwrap_or_default();
                    match forecast_tool::Algorithm::from_str(value) {
                        Some(algorithm) => {
                            let mut config = schedule.config().clone();
                            config.algorithm = algorithm;
                            match schedule.set_config(config) {
                                Ok(()) => println!("Algorithm set to {algorithm}."),
                                Err(err) => println!("Error: {err}"),
                            }
                        }
                        None => println!("Usage: config algorithm <sequential|parallel>"),
                    }
                }
                Some("horizon") => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                    Some(days) => {
                        let mut config = schedule.config().clone();
                        config.days_ahead = days;
                        match schedule.set_config(config) {
                            Ok(()) => println!("Horizon set to {days} days."),
                            Err(err) => println!("Error: {err}"),
                        }
                    }
                    None => println!("Usage: config horizon <days>"),
                },
                Some("chunk") => match parts.next().and_then(hours_to_minutes) {
                    Some(minutes) => {
                        let mut config = schedule.config().clone();
                        config.default_min_block_minutes = minutes;
                        match schedule.set_config(config) {
                            Ok(()) => println!("Default min block updated."),
                            Err(err) => println!("Error: {err}"),
                        }
                    }
                    None => println!("Usage: config chunk <hours>"),
                },
                _ => println!("Usage: config <show|algorithm|horizon|chunk> ..."),
            },
            "forecast" => {
                let result = match parts.next().and_then(parse_datetime) {
                    Some(now) => schedule.refresh_at(now),
                    None => schedule.refresh(),
                };
                match result {
                    Ok(summary) => {
                        println!("Forecast: {}", summary.to_cli_summary());
                        for rejected in &summary.rejected {
                            println!("Rejected: {rejected}");
                        }
                        println!("{}", render_df_as_text_table(schedule.dataframe()));
                        print_late_tasks(&schedule);
                    }
                    Err(err) => println!("Error: {err}"),
                }
            }
            "save" => {
                let format = parts.next();
                let path = parts.next();
                let (Some(format), Some(path)) = (format, path) else {
                    println!("Usage: save <json|csv> <path>");
                    continue;
                };
                let result = match format {
                    "json" => save_schedule_to_json(&schedule, path),
                    "csv" => save_schedule_to_csv(&schedule, path),
                    other => {
                        println!("Unknown format '{other}'.");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Schedule saved to {path}."),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "load" => {
                let format = parts.next();
                let path = parts.next();
                let (Some(format), Some(path)) = (format, path) else {
                    println!("Usage: load <json|csv> <path>");
                    continue;
                };
                let result = match format {
                    "json" => load_schedule_from_json(path),
                    "csv" => load_schedule_from_csv(path),
                    other => {
                        println!("Unknown format '{other}'.");
                        continue;
                    }
                };
                match result {
                    Ok(loaded) => {
                        schedule = loaded;
                        println!("Schedule loaded from {path}.");
                        println!("{}", render_df_as_text_table(schedule.dataframe()));
                    }
                    Err(err) => println!("Error: {err}"),
                }
            }
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}'. Type 'help' for commands."),
        }
    }
}
