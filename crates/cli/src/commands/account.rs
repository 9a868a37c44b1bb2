//! Account commands: sign in and out, register, seller application.

use planet_price_core::{Email, Role};
use planet_price_storefront::api::types::{Credentials, Identity, RegistrationForm};
use planet_price_storefront::guard::{Requirement, return_location};
use planet_price_storefront::navigation::locations;

use super::{CliError, Context};

/// Registration details collected from the command line.
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Sign in, then continue to wherever the login view was asked to return.
pub async fn login(ctx: &Context, username: String, password: String) -> Result<(), CliError> {
    ctx.open(locations::LOGIN);
    let identity = ctx
        .state()
        .session()
        .login(&Credentials { username, password })
        .await?;
    print_identity(&identity);
    leave_entry(ctx);
    Ok(())
}

pub async fn register(ctx: &Context, registration: Registration) -> Result<(), CliError> {
    ctx.open(locations::REGISTER);
    let form = RegistrationForm {
        username: registration.username,
        email: registration.email.into(),
        password: registration.password,
        password_confirm: registration.password_confirm,
        first_name: registration.first_name,
        last_name: registration.last_name,
        role: registration.role,
    };
    let identity = ctx.state().session().register(&form).await?;
    print_identity(&identity);
    leave_entry(ctx);
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.state().session().logout().await;
    ctx.state().navigator().navigate(locations::HOME);
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, "/profile")?;
    if let Some(identity) = ctx.state().session().identity() {
        print_identity(&identity);
    }
    Ok(())
}

pub async fn apply_seller(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, "/profile")?;
    let identity = ctx.state().session().apply_for_seller_role().await?;
    print_identity(&identity);
    Ok(())
}

/// Move off the login/register view once a session exists.
fn leave_entry(ctx: &Context) {
    let navigator = ctx.state().navigator();
    let next = return_location(&navigator.current_location())
        .unwrap_or_else(|| locations::HOME.to_string());
    navigator.navigate(&next);
}

#[allow(clippy::print_stdout)]
fn print_identity(identity: &Identity) {
    println!("{} <{}>", identity.display_name(), identity.email);
    println!("  id:       {}", identity.id);
    println!("  username: {}", identity.username);
    println!("  role:     {}", identity.role);
    if identity.role == Role::Seller {
        let status = if identity.seller_approved {
            "approved"
        } else {
            "awaiting approval"
        };
        println!("  seller:   {status}");
    }
    if identity.is_superuser {
        println!("  admin:    yes");
    }
}
