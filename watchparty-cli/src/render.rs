use colored::*;
use watchparty::client::{LinkState, SessionPhase, SessionView};
use watchparty::model::Participant;

/// Prints what changed between successive session views.
#[derive(Default)]
pub struct ViewPrinter {
    last: SessionView,
}

impl ViewPrinter {
    pub fn show(&mut self, view: &SessionView) {
        for line in describe(&self.last, view) {
            println!("{}", line);
        }
        self.last = view.clone();
    }
}

pub fn describe(old: &SessionView, new: &SessionView) -> Vec<String> {
    let mut lines = Vec::new();

    if old.phase != new.phase {
        match &new.phase {
            SessionPhase::Joined { local_id } => lines.push(
                format!("Joined as {}. Type /help for commands.", local_id.to_string().bold())
                    .green()
                    .to_string(),
            ),
            SessionPhase::Ended(reason) => {
                lines.push(format!("Session ended: {}", reason).yellow().bold().to_string())
            }
            SessionPhase::Disconnected => {}
        }
    }

    for peer in new.peers.iter() {
        match old.peer(&peer.id) {
            None => lines.push(format!("+ {} joined", peer.label()).cyan().to_string()),
            Some(before) if before != peer => {
                lines.push(format!("~ {} {}", peer.label(), flags(peer)).dimmed().to_string())
            }
            Some(_) => {}
        }
    }
    for peer in old.peers.iter() {
        if new.peer(&peer.id).is_none() && !new.phase.is_ended() {
            lines.push(format!("- {} left", peer.label()).cyan().to_string());
        }
    }

    for (id, state) in &new.links {
        if old.link_state(id) != Some(*state) && *state == LinkState::Connected {
            lines.push(format!("Connected to {}", id).green().to_string());
        }
    }

    let fresh = (new.chat_total.saturating_sub(old.chat_total) as usize).min(new.chat.len());
    for entry in &new.chat[new.chat.len() - fresh..] {
        let name = if entry.local {
            entry.name.bold().to_string()
        } else {
            entry.name.magenta().bold().to_string()
        };
        lines.push(format!("<{}> {}", name, entry.text));
    }

    if old.playback.source_url != new.playback.source_url {
        if let Some(url) = &new.playback.source_url {
            lines.push(format!("Now showing {}", url).blue().to_string());
        }
    }
    if old.playback.playing != new.playback.playing
        || old.playback.position_seconds != new.playback.position_seconds
    {
        let verb = if new.playback.playing { "Playing" } else { "Paused" };
        lines.push(
            format!("{} at {:.1}s", verb, new.playback.position_seconds)
                .blue()
                .to_string(),
        );
    }

    lines
}

/// Listing printed by `/peers`.
pub fn peer_table(view: &SessionView) -> Vec<String> {
    let mut lines = vec![format!("You: {} {}", view.local.label().bold(), flags(&view.local))];

    if view.peers.is_empty() {
        lines.push("Nobody else is here yet.".dimmed().to_string());
    }
    for peer in view.peers.iter() {
        let link = match view.link_state(&peer.id) {
            Some(LinkState::Connected) => "connected".green(),
            Some(LinkState::Negotiating) => "negotiating".yellow(),
            Some(LinkState::Closed) | None => "no link".dimmed(),
        };
        lines.push(format!("  {} ({}) {} {}", peer.label(), peer.id, flags(peer), link));
    }
    lines
}

fn flags(participant: &Participant) -> String {
    let mut flags = Vec::new();
    if participant.is_host {
        flags.push("host");
    }
    if participant.camera_enabled {
        flags.push("cam");
    }
    if participant.microphone_enabled {
        flags.push("mic");
    }
    format!("[{}]", flags.join(" "))
}
