//! Line-oriented command loop over stdin.

use std::{io::Write as _, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use client_core::{
    AppState, Command, Confirmer, ItemDraft, ListView, ShoppingController, VoiceToggle,
};
use shared::domain::{CategorySelection, ItemId, StatusFilter};
use tokio::{
    io::{BufReader, Lines, Stdin},
    sync::Mutex,
};
use tracing::debug;

use crate::{capture::FileAudioCapture, render};

pub type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub const HELP: &str = "\
commands:
  list                              show the current view
  refresh                           reload the list from the server
  add <name> [| quantity [| tag]]   add an item
  toggle <n|id>                     mark bought / not bought
  delete <n|id>                     remove an item
  clear                             remove every item
  category <label|all>              filter by category
  filter <all|pending|completed>    filter by status
  categories                        list categories with counts
  stats                             completion statistics
  voice [file]                      start or stop a voice command
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    List,
    Refresh,
    Add(ItemDraft),
    Toggle(String),
    Delete(String),
    Clear,
    Category(CategorySelection),
    Filter(StatusFilter),
    Categories,
    Stats,
    Voice(Option<PathBuf>),
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let input = match word {
        "" => Input::Empty,
        "list" | "ls" => Input::List,
        "refresh" => Input::Refresh,
        "add" => Input::Add(parse_draft(rest)),
        "toggle" => Input::Toggle(required(rest, "toggle <n|id>")?),
        "delete" | "rm" => Input::Delete(required(rest, "delete <n|id>")?),
        "clear" => Input::Clear,
        "category" => Input::Category(CategorySelection::parse(rest)),
        "filter" => Input::Filter(rest.parse()?),
        "categories" => Input::Categories,
        "stats" => Input::Stats,
        "voice" => Input::Voice((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}' (try help)")),
    };
    Ok(input)
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

/// `name | quantity | tag`; blank fields are filled in by validation.
fn parse_draft(rest: &str) -> ItemDraft {
    let mut fields = rest.splitn(3, '|').map(str::trim);
    ItemDraft {
        name: fields.next().unwrap_or_default().to_string(),
        quantity: fields.next().unwrap_or_default().to_string(),
        tag: fields.next().unwrap_or_default().to_string(),
    }
}

/// A 1-based row number in the current view, or a raw item id.
pub fn resolve_item(view: &ListView, state: &AppState, needle: &str) -> Option<ItemId> {
    if let Ok(n) = needle.parse::<usize>() {
        if let Some(item) = n.checked_sub(1).and_then(|i| view.visible.get(i)) {
            return Some(item.id.clone());
        }
    }
    state.find_item(needle).map(|item| item.id.clone())
}

pub struct StdinConfirmer {
    input: SharedInput,
}

impl StdinConfirmer {
    pub fn new(input: SharedInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = std::io::stdout().flush();
        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim(), "y" | "Y" | "yes" | "כן"),
            _ => false,
        }
    }
}

pub async fn run(
    controller: &Arc<ShoppingController>,
    capture: &FileAudioCapture,
    input: &SharedInput,
) -> anyhow::Result<()> {
    println!("{HELP}");
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = input.lock().await.next_line().await?;
        let Some(line) = line else {
            break;
        };
        match parse(&line) {
            Ok(Input::Quit) => break,
            Ok(cmd) => handle(controller, capture, cmd).await,
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}

async fn handle(controller: &Arc<ShoppingController>, capture: &FileAudioCapture, input: Input) {
    let command = match input {
        Input::Empty => return,
        Input::Help => {
            println!("{HELP}");
            return;
        }
        Input::List => {
            let state = controller.snapshot().await;
            print!("{}", render::list(&ListView::project(&state), state.last_synced_at));
            return;
        }
        Input::Categories => {
            for count in controller.view().await.counts {
                println!("  {} ({})", count.category, count.count);
            }
            return;
        }
        Input::Stats => {
            match controller.load_stats().await {
                Ok(stats) => {
                    let tag_stats = controller.snapshot().await.tag_stats;
                    print!("{}", render::stats(&stats, &tag_stats));
                }
                Err(err) => println!("{}", render::failure(&err.to_api_error())),
            }
            return;
        }
        Input::Voice(source) => {
            if let Some(path) = source {
                capture.set_source(path);
                controller.check_microphone().await;
            }
            match controller.toggle_voice().await {
                VoiceToggle::Busy => println!("voice command still processing"),
                VoiceToggle::Stopped => println!("stopping..."),
                other => debug!(?other, "voice toggle"),
            }
            return;
        }
        Input::Toggle(needle) => {
            let Some(item_id) = lookup(controller, &needle).await else {
                println!("no item '{needle}'");
                return;
            };
            Command::ToggleItem { item_id }
        }
        Input::Delete(needle) => {
            let Some(item_id) = lookup(controller, &needle).await else {
                println!("no item '{needle}'");
                return;
            };
            Command::DeleteItem { item_id }
        }
        Input::Refresh => Command::Refresh,
        Input::Add(draft) => Command::AddItem(draft),
        Input::Clear => Command::ClearList,
        Input::Category(selection) => Command::SelectCategory(selection),
        Input::Filter(filter) => Command::SetFilter(filter),
        Input::Quit => return,
    };

    if let Err(err) = controller.dispatch(command).await {
        println!("{}", render::failure(&err.to_api_error()));
    }
}

async fn lookup(controller: &ShoppingController, needle: &str) -> Option<ItemId> {
    let state = controller.snapshot().await;
    resolve_item(&ListView::project(&state), &state, needle)
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;
