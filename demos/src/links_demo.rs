use anyhow::Context;
use spark::links::{NewSocialLink, Platform, SocialLinkPatch};
use spark::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spark_demos::init();

    let email = env::var("SPARK_EMAIL").context("SPARK_EMAIL must be set")?;
    let password = env::var("SPARK_PASSWORD").context("SPARK_PASSWORD must be set")?;

    let spark = Spark::new(SparkConfig::from_env()?)?;
    let _listener = spark.session().listen();

    let state = spark.session().bootstrap().await;
    let user = match state.user() {
        Some(user) => user.clone(),
        None => {
            let form = SignInForm { email, password };
            spark.session().sign_in(&form).await?
        }
    };
    println!("Managing links of {}", user.username);

    let mut links = spark.link_list(&user.id).await?;
    for link in links.links() {
        println!("  [{}] {} - {}", link.position, link.platform.display_name(), link.url);
    }

    let added = links
        .add(NewSocialLink::new(
            Platform::GitHub,
            Platform::GitHub.placeholder(),
            "Code",
        ))
        .await?;
    println!("Added {} at position {}", added.title, added.position);

    let patch = SocialLinkPatch {
        title: Some("My code".to_string()),
        ..Default::default()
    };
    let updated = links.update(&added.id, &patch).await?;
    println!("Renamed link to {}", updated.title);

    links.delete(&added.id).await?;
    println!("Deleted it again, {} links left", links.len());

    Ok(())
}
