use super::*;

#[test]
fn parses_calculate_with_defaults() {
    let cli = Cli::try_parse_from(["engage-cli", "calculate", "natgeo"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Calculate {
            ref handle,
            post_limit: DEFAULT_SAMPLE_SIZE,
            raw: false,
        } if handle == "natgeo"
    ));
}

#[test]
fn parses_calculate_with_limit_and_raw() {
    let cli = Cli::try_parse_from([
        "engage-cli",
        "calculate",
        "@natgeo",
        "--post-limit",
        "5",
        "--raw",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Calculate {
            ref handle,
            post_limit: 5,
            raw: true,
        } if handle == "@natgeo"
    ));
}

#[test]
fn negative_post_limit_is_rejected() {
    let result = Cli::try_parse_from(["engage-cli", "calculate", "natgeo", "--post-limit", "-1"]);
    assert!(result.is_err());
}

#[test]
fn calculate_requires_a_handle() {
    assert!(Cli::try_parse_from(["engage-cli", "calculate"]).is_err());
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["engage-cli"]).is_err());
}
