use chorebridge_core::Config;

use super::read_input;

pub fn run(input: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_input(input)?;
    let parsed = Config::load_or_default().task_parser().parse(&raw);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    for issue in &parsed.issues {
        match issue.index {
            Some(i) => eprintln!("warning: element {i}: {}", issue.message),
            None => eprintln!("warning: {}", issue.message),
        }
    }

    if parsed.tasks.is_empty() {
        println!("No chores.");
        return Ok(());
    }

    for task in &parsed.tasks {
        let due = task.next_due_date.as_deref().unwrap_or("-");
        let marker = if task.is_reminder_eligible() { "*" } else { " " };
        println!("{marker} {:>6}  {:<24}  {due}", task.id, task.name);
    }
    Ok(())
}
