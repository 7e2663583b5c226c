//! Evaluates a few filters against a sample user and shows what the SQL
//! translator pushes down for each of them.
//!
//! Run with `cargo run --example filter_demo`.

use serde_json::json;

use scim_filter::backend::SqlTranslator;
use scim_filter::config::AppConfig;
use scim_filter::filter::{Evaluator, Filter, FilterTranslator};
use scim_filter::logging::init_logging;
use scim_filter::AppResult;

fn main() -> AppResult<()> {
    init_logging("debug")?;

    let user = json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": "2819c223-7f76-453a-919d-413861904646",
        "userName": "bjensen@example.com",
        "name": { "familyName": "Jensen", "givenName": "Barbara" },
        "title": "Tour Guide",
        "active": true,
        "emails": [
            { "value": "bjensen@example.com", "type": "work", "primary": true },
            { "value": "babs@jensen.org", "type": "home" }
        ],
        "meta": { "lastModified": "2011-05-13T04:42:34Z" }
    });

    let config = AppConfig::default_config();
    let resolver = config.resolver();
    let evaluator = Evaluator::new(&resolver);
    let translator = SqlTranslator::from_config(&config)?;

    let filters = [
        "userName eq \"BJENSEN@example.com\"",
        "name.familyName co \"ens\" and active eq true",
        "emails[type eq \"work\" and value co \"@example.com\"]",
        "(title pr or userType eq \"Intern\") and not (meta.lastModified lt \"2011-01-01T00:00:00Z\")",
        "nickName eq \"Babs\" or userName sw \"bj\"",
    ];

    for text in filters {
        let filter = Filter::from(text)?;
        let matches = evaluator.evaluate(&filter, &user)?;
        let select = translator.select(&translator.translate(Some(&filter))?);

        println!("{}", filter);
        println!("  matches: {}", matches);
        println!("  sql:     {}", select);
    }

    Ok(())
}
