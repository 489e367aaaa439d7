use std::io::Write;

use anyhow::Result;
use clap::ArgMatches;
use pickup_core::{Error, IdentityProvider, ParentProfile};

use super::{arg, reported};
use crate::app::App;

pub async fn handle_signup(app: &mut App, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    app.ensure_not_waiting()?;

    let email = arg(matches, "email")?;
    let password = arg(matches, "password")?;
    let national_id = arg(matches, "national-id")?;
    let optional = |name: &str| matches.get_one::<String>(name).cloned().unwrap_or_default();

    let user = app.identity.sign_up(email, password, national_id).await?;
    app.session.begin(user.clone(), None);
    let profile = ParentProfile {
        first_name: optional("first-name"),
        last_name: optional("last-name"),
        national_id: national_id.trim().to_string(),
        phone: optional("phone"),
        email: email.trim().to_lowercase(),
    };
    if let Err(err) = app.directory.save(&user, &profile).await {
        app.session.logout(app.identity.as_ref()).await;
        return Err(err.into());
    }

    writeln!(out, "Account created for {}.", profile.email)?;
    app.session.begin(user, Some(profile));
    reported(app.flow.refresh().await);
    Ok(())
}

pub async fn handle_login(app: &mut App, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    app.ensure_not_waiting()?;

    let identifier = arg(matches, "identifier")?;
    let password = arg(matches, "password")?;

    let user = if identifier.contains('@') {
        app.identity.sign_in_with_email(identifier, password).await?
    } else {
        app.identity
            .sign_in_with_national_id(identifier, password)
            .await?
    };

    app.session.begin(user.clone(), None);

    let profile = match app.directory.load(&user).await {
        Ok(profile) => Some(profile),
        Err(Error::NotFound(_)) => None,
        Err(e) => {
            app.session.logout(app.identity.as_ref()).await;
            return Err(e.into());
        }
    };

    match profile.as_ref().map(ParentProfile::full_name) {
        Some(name) if !name.is_empty() => writeln!(out, "Welcome back, {name}!")?,
        _ => writeln!(out, "Welcome back!")?,
    }
    app.session.begin(user, profile);
    reported(app.flow.refresh().await);
    Ok(())
}

pub async fn handle_logout(app: &mut App, out: &mut dyn Write) -> Result<()> {
    app.ensure_not_waiting()?;

    let signed_in = app.session.is_active() || app.identity.current_user_id().await.is_some();
    app.session.logout(app.identity.as_ref()).await;

    if signed_in {
        writeln!(out, "Logged out.")?;
    } else {
        writeln!(out, "Not logged in.")?;
    }
    Ok(())
}

pub fn handle_whoami(app: &App, out: &mut dyn Write) -> Result<()> {
    let Some(user) = app.session.user_id() else {
        writeln!(out, "Not logged in.")?;
        return Ok(());
    };

    writeln!(out, "Parent id: {user}")?;
    if let Some(profile) = app.session.profile() {
        writeln!(out, "Name:      {}", profile.full_name())?;
        writeln!(out, "Email:     {}", profile.email)?;
        writeln!(out, "ID number: {}", profile.national_id)?;
        if !profile.phone.is_empty() {
            writeln!(out, "Phone:     {}", profile.phone)?;
        }
    }
    Ok(())
}
