use libbuck::diff::Change;
use libbuck::error::BuckResult;
use libbuck::event::{channel, EventSender, PathEventKind};
use libbuck::options::MergeStrategy;
use libbuck::remote::Links;
use std::io::Write;
use tokio::task::JoinHandle;

pub fn print_diff(changes: &[Change]) {
    for change in changes {
        println!("{}  {}", change.kind.label(), change.rel.display());
    }
}

/// y/N prompt used when a command is run without `--yes`
pub fn confirm(changes: &[Change]) -> bool {
    print_diff(changes);
    print!("Continue? [y/N] ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

pub fn confirm_msg(message: &str) -> bool {
    print!("{} [y/N] ", message);
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

/// per-collision prompt for `buck add`
pub fn select_merge(description: &str, is_dir: bool) -> BuckResult<MergeStrategy> {
    let choices = if is_dir { "[s]kip, [m]erge, [r]eplace" } else { "[s]kip, [r]eplace" };
    loop {
        print!("{} ({}): ", description, choices);
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        match line.trim() {
            "s" | "S" => return Ok(MergeStrategy::Skip),
            "m" | "M" if is_dir => return Ok(MergeStrategy::Merge),
            "r" | "R" => return Ok(MergeStrategy::Replace),
            _ => {}
        }
    }
}

/// renders transfer events as plain lines until the engine drops its sender
pub fn event_printer() -> (EventSender, JoinHandle<()>) {
    let (tx, mut rx) = channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.kind {
                PathEventKind::FileComplete => {
                    println!("+ {} ({:#})", event.path, event.cid);
                }
                PathEventKind::FileRemoved => {
                    println!("- {}", event.path);
                }
                _ => {}
            }
        }
    });
    (tx, handle)
}

pub fn print_links(links: &Links) {
    println!("url:  {}", links.url);
    if !links.www.is_empty() {
        println!("www:  {}", links.www);
    }
    if !links.ipns.is_empty() {
        println!("ipns: {}", links.ipns);
    }
}
