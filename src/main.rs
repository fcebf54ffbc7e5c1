use std::process::Command;

use anyhow::{anyhow, Context};
use clap::ArgMatches;

use linkshelf::filter::Filter;
use linkshelf::models::AccountToInsert;
use linkshelf::render::{render_capacity, render_entries, render_notice};
use linkshelf::{account, cli, config::Config, db, logging, open_shelf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::app().get_matches();
    let config = Config::from_matches(&matches)?;
    logging::init(config.verbosity);

    if let Some(matches) = matches.subcommand_matches("account") {
        return run_account(&config, matches);
    }

    let mut shelf = open_shelf(&config)?;
    if let Some(notice) = shelf.notice() {
        eprintln!("{}", render_notice(notice));
    }

    if let Some(matches) = matches.subcommand_matches("add") {
        let text = matches.value_of("text").unwrap_or_default();
        match shelf.add_entry(text, matches.value_of("category")).await? {
            Some(entry) => println!("{}\t{}", entry.id, entry.title()),
            None => eprintln!("Empty text ignored"),
        }
        println!("{}", render_capacity(&shelf.capacity()));
    } else if let Some(matches) = matches.subcommand_matches("list") {
        let filter = Filter::new(
            matches.value_of("category").unwrap_or_default(),
            matches.value_of("search").unwrap_or_default(),
        );
        let view = shelf.view(&filter);
        print!("{}", render_entries(&view, !matches.is_present("no-pretty")));
        println!("{}", render_capacity(&shelf.capacity()));
    } else if let Some(matches) = matches.subcommand_matches("delete") {
        let id = parse_id(matches)?;
        if let Some(notice) = shelf.delete_entry(id)? {
            println!("{}", render_notice(&notice));
        }
        println!("{}", render_capacity(&shelf.capacity()));
    } else if let Some(matches) = matches.subcommand_matches("open") {
        let id = parse_id(matches)?;
        let entry = shelf
            .get(id)
            .ok_or_else(|| anyhow!("No bookmark with ID {}", id))?;
        open_in_browser(&entry.text)?;
    } else if matches.subcommand_matches("storage").is_some() {
        println!("{}", render_capacity(&shelf.capacity()));
    }
    Ok(())
}

fn parse_id(matches: &ArgMatches) -> anyhow::Result<i64> {
    let id = matches.value_of("id").unwrap_or_default();
    id.parse()
        .with_context(|| format!("{:?} is not a bookmark ID", id))
}

fn run_account(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let conn = db::connect(&config.database)?;

    if let Some(matches) = matches.subcommand_matches("register") {
        let new = AccountToInsert {
            clerk_id: matches.value_of("clerk-id").unwrap_or_default(),
            email: matches.value_of("email").unwrap_or_default(),
            username: matches.value_of("username"),
            photo: matches.value_of("photo").unwrap_or_default(),
            firstname: matches.value_of("firstname"),
            lastname: matches.value_of("lastname"),
        };
        let registered = account::register(&conn, &new)?;
        println!("{}\t{}\t{}", registered.id, registered.clerk_id, registered.email);
    } else if let Some(matches) = matches.subcommand_matches("show") {
        let clerk_id = matches.value_of("clerk-id").unwrap_or_default();
        match account::find_by_clerk_id(&conn, clerk_id)? {
            Some(found) => println!(
                "{}\t{}\t{}\t{}\t{} {}\t{}",
                found.id,
                found.clerk_id,
                found.email,
                found.username.unwrap_or_default(),
                found.firstname.unwrap_or_default(),
                found.lastname.unwrap_or_default(),
                found.photo
            ),
            None => eprintln!("No account for {}", clerk_id),
        }
    }
    Ok(())
}

fn open_in_browser(target: &str) -> anyhow::Result<()> {
    if cfg!(target_os = "windows") {
        Command::new("cmd")
            .args(vec!["/C", "start", target])
            .output()?;
    } else if cfg!(target_os = "macos") {
        Command::new("open").args(vec![target]).output()?;
    } else if cfg!(target_os = "linux") {
        Command::new("xdg-open").args(vec![target]).output()?;
    } else {
        eprintln!("Could not open bookmark, not implemented for your OS.")
    }
    Ok(())
}
