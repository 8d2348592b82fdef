use anyhow::{Context, Result, bail};
use watchparty::client::LocalAction;
use watchparty::model::{ParticipantId, PlaybackAction};

pub const HELP: &str = "\
/cam on|off      toggle the camera
/mic on|off      toggle the microphone
/host [off]      claim or release host
/connect ID      connect to a peer by its 5 character id
/share URL       share a video with everyone (host only)
/play [s]        resume, optionally from s seconds
/pause [s]       pause, optionally at s seconds
/seek s          jump to s seconds
/kick ID         remove a peer (host only)
/peers           list participants
/leave           leave the session
/help            show this list
anything else is sent as chat";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action(LocalAction),
    /// Drives the local player, which then reports the transition.
    Transport {
        action: PlaybackAction,
        position_seconds: Option<f64>,
    },
    Peers,
    Help,
}

/// Parses a stdin line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Action(LocalAction::SendChat(line.to_owned()))));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();

    let command = match name {
        "cam" => Command::Action(LocalAction::SetCamera(switch(arg)?)),
        "mic" => Command::Action(LocalAction::SetMicrophone(switch(arg)?)),
        "host" => match arg {
            None => Command::Action(LocalAction::SetHost(true)),
            Some(_) => Command::Action(LocalAction::SetHost(switch(arg)?)),
        },
        "connect" => Command::Action(LocalAction::ConnectPeer(required(arg, "/connect ID")?.to_owned())),
        "share" => Command::Action(LocalAction::ShareVideo(required(arg, "/share URL")?.to_owned())),
        "kick" => Command::Action(LocalAction::RemovePeer(ParticipantId::from(
            required(arg, "/kick ID")?,
        ))),
        "leave" => Command::Action(LocalAction::Leave),
        "play" => transport(PlaybackAction::Play, arg.map(seconds).transpose()?),
        "pause" => transport(PlaybackAction::Pause, arg.map(seconds).transpose()?),
        "seek" => transport(
            PlaybackAction::Seek,
            Some(seconds(required(arg, "/seek SECONDS")?)?),
        ),
        "peers" => Command::Peers,
        "help" => Command::Help,
        other => bail!("Unknown command /{}. Try /help", other),
    };

    Ok(Some(command))
}

fn transport(action: PlaybackAction, position_seconds: Option<f64>) -> Command {
    Command::Transport {
        action,
        position_seconds,
    }
}

fn switch(arg: Option<&str>) -> Result<bool> {
    match arg {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("Expected on or off"),
    }
}

fn required<'a>(arg: Option<&'a str>, usage: &str) -> Result<&'a str> {
    arg.with_context(|| format!("Usage: {}", usage))
}

fn seconds(arg: &str) -> Result<f64> {
    let value: f64 = arg
        .parse()
        .with_context(|| format!("Not a number of seconds: {}", arg))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Position must be zero or more seconds");
    }
    Ok(value)
}
