use influxboot_common::auth_list::TokenListing;
use influxboot_common::credentials::CredentialsRecord;
use influxboot_common::env::{bootstrap_vars, render_exports};
use influxboot_common::types::{BootstrapSettings, TOKEN_FIELD};

const CREDENTIALS: &str = "\
# InfluxDB dev credentials
user = \"rctrl\"
password = \"pw\"
org = \"o\"
bucket = \"b\"
retention = \"30d\"
token = \"PLACEHOLDER\"   # filled in on first boot
";

const AUTH_LIST: &str = "\
ID\t\t\tDescription\tToken\tUser Name\tUser ID\t\t\tPermissions
0a0b1c2d3e4f5001\trctrl2's Token\tzzz999\trctrl2\t\t0b0b1c2d3e4f5002\t[read:orgs]
0a0b1c2d3e4f5003\trctrl's Token\tabc123\trctrl\t\t0b0b1c2d3e4f5004\t[read:orgs write:buckets]
";

#[test]
fn listed_token_replaces_only_the_placeholder() {
    let mut record = CredentialsRecord::parse(CREDENTIALS);
    let settings = BootstrapSettings::from_record(&record).expect("all fields should be present");
    assert!(settings.has_placeholder_token());

    let listing = TokenListing::parse(AUTH_LIST).expect("table output should parse");
    let token = listing.token_for_user(&settings.user).expect("rctrl should have a token");
    assert_eq!(token, "abc123");

    record.set(TOKEN_FIELD, token).expect("token should be storable");
    assert_eq!(record.render(), CREDENTIALS.replace("PLACEHOLDER", "abc123"));

    let reparsed = CredentialsRecord::parse(record.render());
    let updated = BootstrapSettings::from_record(&reparsed).unwrap();
    assert_eq!(updated.token, "abc123");
    assert_eq!(BootstrapSettings { token: settings.token.clone(), ..updated }, settings);
}

#[test]
fn exports_reflect_the_stored_token() {
    let record = CredentialsRecord::parse(&CREDENTIALS.replace("PLACEHOLDER", "abc123"));
    let settings = BootstrapSettings::from_record(&record).unwrap();
    let exports = render_exports(&bootstrap_vars("/home/dev/credentials.toml", &settings));

    assert!(exports.starts_with("export CREDENTIALS_FILE='/home/dev/credentials.toml'\n"));
    assert!(exports.contains("export INFLUX_RETENTION='30d'\n"));
    assert!(exports.ends_with("export INFLUX_TOKEN='abc123'\n"));
}
