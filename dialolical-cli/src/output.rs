use colored::Colorize;
use dialolical_core::SessionEvent;

/// Transcript line for an event, without styling. Events that only matter
/// in the logs return `None`.
pub fn describe(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::Registered {
            participant_id,
            display_name,
        } => format!("Registered as {} (id: {})", display_name, participant_id),
        SessionEvent::Joining { proposition, .. } => format!("Joining: \"{}\"", proposition),
        SessionEvent::Created { proposition, .. } => format!(
            "Created: \"{}\" - waiting for opponent (run another bot!)",
            proposition
        ),
        SessionEvent::WaitingForTurn { .. } => return None,
        SessionEvent::TurnSubmitted { turn_number, .. } => {
            format!("Turn {} submitted", turn_number)
        }
        SessionEvent::DialogueNotInProgress { round, status } => {
            format!("Dialogue is {}, skipping round {}", status, round + 1)
        }
        SessionEvent::Concluded { .. } => "Conclusion submitted".to_string(),
        SessionEvent::Reacted { emoji, .. } => format!("Reacted with {}", emoji),
        SessionEvent::Finished { view_url } => format!("Done! View at: {}", view_url),
    };
    Some(line)
}

pub fn render(event: &SessionEvent) {
    let Some(line) = describe(event) else {
        return;
    };

    match event {
        SessionEvent::Finished { .. } => println!("{} {}", "✓".green().bold(), line.green()),
        SessionEvent::Created { .. } => println!("{} {}", "✓".green().bold(), line.cyan()),
        SessionEvent::TurnSubmitted { .. } => println!("  {} {}", "→".blue(), line),
        SessionEvent::DialogueNotInProgress { .. } => println!("  {} {}", "!".yellow(), line.dimmed()),
        _ => println!("{} {}", "→".blue(), line),
    }
}
