use spark::prelude::*;
use std::env;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spark_demos::init();

    let username = env::args().nth(1).unwrap_or_else(|| "alice".to_string());
    let origin = Url::parse(&env::var("SPARK_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string()))?;

    let spark = Spark::new(SparkConfig::from_env()?)?;

    match spark.profiles().load_public(&username).await {
        Ok(page) => {
            println!("{} ({})", page.username(), page.initials());
            println!("{}", spark::profile::profile_url(&origin, page.username())?);
            for link in &page.links {
                println!("  {} - {}", link.title, link.url);
            }
        }
        Err(Error::NotFound(_)) => println!("Profile not found"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
