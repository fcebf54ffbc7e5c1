use clap::{App, AppSettings, Arg, SubCommand};

/// Command line interface of the shelf.
pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_REPOSITORY"))
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(
            Arg::with_name("database")
                .help("Overrides the default database location")
                .long("database")
                .env("LINKSHELF_DATABASE")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("endpoint")
                .help("Metadata service queried for titles and preview images")
                .long("endpoint")
                .env("LINKSHELF_ENDPOINT")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("fetch-timeout")
                .help("Seconds to wait for the metadata service, unlimited by default")
                .long("fetch-timeout")
                .env("LINKSHELF_FETCH_TIMEOUT")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Log more, repeat for extra detail")
                .short("v")
                .long("verbose")
                .global(true)
                .multiple(true),
        )
        .subcommand(
            SubCommand::with_name("add")
                .about("Save a link or a snippet of text")
                .arg(
                    Arg::with_name("text")
                        .help("The link or text to bookmark")
                        .required(true),
                )
                .arg(
                    Arg::with_name("category")
                        .help("Label for the bookmark, defaults to the looked-up category")
                        .long("category")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List bookmarks and the remaining storage")
                .arg(
                    Arg::with_name("category")
                        .help("Only list bookmarks whose category contains this")
                        .long("category")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("search")
                        .help("Only list bookmarks whose text or title contains this")
                        .long("search")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("no-pretty")
                        .help("Turns off padding for pretty output")
                        .long("no-pretty"),
                ),
        )
        .subcommand(
            SubCommand::with_name("delete")
                .about("Delete a bookmark")
                .arg(
                    Arg::with_name("id")
                        .help("The ID of the bookmark to remove")
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("open")
                .about("Open a bookmark in your browser")
                .arg(
                    Arg::with_name("id")
                        .help("The ID of the bookmark to open")
                        .required(true),
                ),
        )
        .subcommand(SubCommand::with_name("storage").about("Show how much storage is left"))
        .subcommand(
            SubCommand::with_name("account")
                .about("Manage account records")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("register")
                        .about("Record an account for an external identity")
                        .arg(
                            Arg::with_name("clerk-id")
                                .help("Identity issued by the sign-in provider")
                                .long("clerk-id")
                                .takes_value(true)
                                .required(true),
                        )
                        .arg(
                            Arg::with_name("email")
                                .long("email")
                                .takes_value(true)
                                .required(true),
                        )
                        .arg(
                            Arg::with_name("photo")
                                .help("Profile picture URL")
                                .long("photo")
                                .takes_value(true)
                                .required(true),
                        )
                        .arg(Arg::with_name("username").long("username").takes_value(true))
                        .arg(Arg::with_name("firstname").long("firstname").takes_value(true))
                        .arg(Arg::with_name("lastname").long("lastname").takes_value(true)),
                )
                .subcommand(
                    SubCommand::with_name("show")
                        .about("Show the account for an external identity")
                        .arg(
                            Arg::with_name("clerk-id")
                                .help("Identity issued by the sign-in provider")
                                .required(true),
                        ),
                ),
        )
}
