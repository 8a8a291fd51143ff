use crate::core::nirvana::{NirvanaError, Task, TaskState};
use crate::core::Services;

use super::OutputFormat;

pub async fn list(services: &Services, list: &str, format: OutputFormat) -> anyhow::Result<()> {
    let state =
        TaskState::parse_query(list).ok_or_else(|| NirvanaError::InvalidList(list.to_string()))?;
    services.cache.get_data(false).await?;

    let tasks = services.cache.tasks_by_state(state);
    println!("{}", render(&tasks, format)?);
    Ok(())
}

pub async fn search(services: &Services, query: &str, format: OutputFormat) -> anyhow::Result<()> {
    services.cache.get_data(false).await?;

    let tasks = services.cache.search_tasks(query);
    println!("{}", render(&tasks, format)?);
    Ok(())
}

fn render(tasks: &[Task], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(tasks)?);
    }

    let mut out = format!("{:<36} {:<10} Name\n{}", "ID", "List", "-".repeat(80));
    for task in tasks {
        let list = match (task.list(), task.state()) {
            (Some(list), _) => list.name().to_string(),
            (None, Some(code)) => code.to_string(),
            (None, None) => "-".to_string(),
        };
        let name: String = task.name().chars().take(40).collect();
        out.push_str(&format!("\n{:<36} {:<10} {}", task.id, list, name));
    }
    if tasks.is_empty() {
        out.push_str("\n(no tasks)");
    }
    Ok(out)
}
