use anyhow::Context;
use spark::prelude::*;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spark_demos::init();

    let config = SparkConfig::from_env().context("SUPABASE_URL and SUPABASE_ANON_KEY must be set")?;
    let spark = Spark::new(config)?;

    println!("Starting sign-up demo");

    // 毎回新しいアカウントを作る
    let suffix = Uuid::new_v4().simple().to_string();
    let form = SignUpForm {
        username: format!("demo-{}", &suffix[..8]),
        email: format!("demo-{}@example.com", suffix),
        password: "securePassword123!".to_string(),
        confirm_password: "securePassword123!".to_string(),
    };

    println!("Signing up {} <{}>", form.username, form.email);
    let outcome = spark.accounts().sign_up(&form).await?;

    if outcome.email_confirmation_required {
        println!("Check {} for the confirmation link, then sign in.", form.email);
        return Ok(());
    }

    let state = spark.session().bootstrap().await;
    println!("Session after sign-up: {:?}", state);

    let user = spark.session().require_user()?;
    println!("Signed in as {} ({})", user.username, user.email);

    spark.session().logout().await?;
    println!("Signed out, session is now {:?}", spark.session().current());

    Ok(())
}
