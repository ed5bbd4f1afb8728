use model::settings::JsonSettingsStore;

const USAGE: &str = "Usage: twitch <add|remove> <name> | twitch list | twitch channel <#channel> \
| twitch message <text|clear> | twitch thumbnail <name> <url|clear> | twitch force <name>";

/// The `twitch` admin group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwitchCommand {
    Add(String),
    Remove(String),
    List,
    Channel(u64),
    Message(Option<String>),
    Thumbnail { name: String, url: Option<String> },
    Force(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    /// Needs the poller; the broadcaster is forwarded over the central channel.
    Force(String),
}

impl TwitchCommand {
    /// Parses text with the prefix already stripped. Returns None if the text is not a
    /// `twitch` command at all, and an error with usage help if it is malformed.
    pub fn parse(text: &str) -> Option<Result<Self, &'static str>> {
        let text = text.trim();
        let (group, rest) = text.split_once(' ').unwrap_or((text, ""));
        if group != "twitch" {
            return None;
        }

        let rest = rest.trim();
        let (sub, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let args = args.trim();

        let command = match (sub, args) {
            ("add", name) if is_name(name) => Self::Add(name.to_lowercase()),
            ("remove", name) if is_name(name) => Self::Remove(name.to_lowercase()),
            ("list", "") => Self::List,
            ("channel" | "setchannel", channel) => match parse_channel(channel) {
                Some(id) => Self::Channel(id),
                None => return Some(Err(USAGE)),
            },
            ("message", "clear") => Self::Message(None),
            ("message", text) if !text.is_empty() => Self::Message(Some(text.to_string())),
            ("thumbnail", args) => {
                let (name, url) = args.split_once(' ').unwrap_or((args, ""));
                let url = url.trim();
                if !is_name(name) || url.is_empty() {
                    return Some(Err(USAGE));
                }

                Self::Thumbnail {
                    name: name.to_lowercase(),
                    url: (url != "clear").then(|| url.to_string()),
                }
            }
            ("force", name) if is_name(name) => Self::Force(name.to_lowercase()),
            _ => return Some(Err(USAGE)),
        };

        Some(Ok(command))
    }

    pub async fn run(self, store: &JsonSettingsStore, guild_id: u64) -> anyhow::Result<Outcome> {
        let reply = match self {
            Self::Add(name) => {
                if store.modify_guild(guild_id, |g| g.add_broadcaster(&name)).await? {
                    format!("> Added `{name}` to the list of broadcasters to check.")
                } else {
                    format!("> `{name}` is already in the list of broadcasters.")
                }
            }
            Self::Remove(name) => {
                if store
                    .modify_guild(guild_id, |g| g.remove_broadcaster(&name))
                    .await?
                {
                    format!("> Removed `{name}` from the list of broadcasters.")
                } else {
                    format!("> `{name}` is not in the list of broadcasters.")
                }
            }
            Self::List => {
                let guild = store.guild(guild_id).await?;
                if guild.broadcasters.is_empty() {
                    "> There are no broadcasters set to check for this guild.".into()
                } else {
                    let channel = guild
                        .channel_id
                        .map_or_else(|| "None".to_string(), |c| format!("<#{c}>"));

                    format!(
                        "Current broadcasters set to check for this guild:\n> Announcement Channel: {channel}\n> {}",
                        guild.broadcasters.join("\n> ")
                    )
                }
            }
            Self::Channel(id) => {
                store
                    .modify_guild(guild_id, |g| g.channel_id = Some(id))
                    .await?;
                format!("> Set announcement channel to <#{id}>.")
            }
            Self::Message(message) => {
                let reply = match &message {
                    Some(_) => "> Set the announcement message.",
                    None => "> Reset the announcement message to the default.",
                };
                store.modify_guild(guild_id, |g| g.message = message).await?;
                reply.into()
            }
            Self::Thumbnail { name, url } => {
                let reply = match &url {
                    Some(_) => format!("> Set a custom thumbnail for `{name}`."),
                    None => format!("> Removed the custom thumbnail for `{name}`."),
                };
                store
                    .modify_guild(guild_id, |g| g.set_thumbnail(&name, url))
                    .await?;
                reply
            }
            Self::Force(name) => return Ok(Outcome::Force(name)),
        };

        Ok(Outcome::Reply(reply))
    }
}

fn is_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

/// Accepts a channel mention (`<#123>`) or a bare id.
fn parse_channel(text: &str) -> Option<u64> {
    text.trim()
        .trim_start_matches("<#")
        .trim_end_matches('>')
        .parse()
        .ok()
}
