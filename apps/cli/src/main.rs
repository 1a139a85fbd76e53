use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{config::load_settings, CinemaClient, LogNotifier, Navigation, Route};
use serde::Serialize;
use shared::{
    domain::{MovieId, ReservationId, Role, ScreeningId, SeatId, TheaterId, TicketId, UserId},
    protocol::{Credentials, PaymentRequest, ReservationDraft},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cinema", about = "Browse and book cinema screenings")]
struct Args {
    /// Overrides the API base url from cinema.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    Movies {
        #[arg(long)]
        genre: Option<String>,
        #[arg(long, conflicts_with = "genre")]
        popular: bool,
    },
    Movie {
        id: i64,
    },
    Screenings {
        #[arg(long, conflicts_with = "theater")]
        movie: Option<i64>,
        #[arg(long)]
        theater: Option<i64>,
    },
    Seats {
        screening: i64,
    },
    Theaters {
        #[arg(long = "type")]
        theater_type: Option<String>,
    },
    Reservations,
    Book {
        #[arg(long)]
        screening: i64,
        #[arg(long, value_delimiter = ',', required = true)]
        seats: Vec<i64>,
    },
    Cancel {
        reservation: i64,
    },
    Pay {
        reservation: i64,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "card")]
        method: String,
    },
    Ticket {
        id: i64,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Dashboard,
    Occupancy,
    Revenue,
    Users,
    Promote {
        user: i64,
        #[arg(long)]
        revoke: bool,
    },
}

impl Command {
    fn route(&self) -> Option<Route> {
        match self {
            Command::Movie { id } => Some(Route::MovieDetail(MovieId(*id))),
            Command::Book { screening, .. } => Some(Route::Booking(ScreeningId(*screening))),
            Command::Whoami
            | Command::Reservations
            | Command::Cancel { .. }
            | Command::Pay { .. }
            | Command::Ticket { .. } => Some(Route::Profile),
            Command::Login { .. } => Some(Route::Login),
            Command::Admin(_) => Some(Route::Admin),
            _ => None,
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    let client = CinemaClient::connect(&settings, Arc::new(LogNotifier)).await?;

    if let Some(route) = args.command.route() {
        match client.navigate(&route) {
            Navigation::Allow => {}
            Navigation::RedirectToLogin { redirect } => {
                bail!("sign in first: cinema login --email <email> --password <password> (wanted {redirect})")
            }
            Navigation::RedirectHome => bail!("{route} is not available to this account"),
        }
    }

    match args.command {
        Command::Login { email, password } => {
            let user = client
                .auth()
                .login(&Credentials { email, password })
                .await?;
            info!(user_id = user.id.0, "cli: signed in");
            print(&user)?;
        }
        Command::Logout => client.auth().logout().await,
        Command::Whoami => print(&client.auth().get_profile().await?)?,
        Command::Movies { genre, popular } => {
            let movies = match genre {
                _ if popular => client.movies().fetch_popular_movies().await?,
                Some(genre) => client.movies().fetch_movies_by_genre(&genre).await?,
                None => client.movies().fetch_movies().await?,
            };
            print(&movies)?;
        }
        Command::Movie { id } => {
            let movie = client.movies().fetch_movie(MovieId(id)).await?;
            let screenings = client
                .screenings()
                .fetch_screenings_by_movie(movie.id)
                .await?;
            print(&movie)?;
            print(&screenings)?;
        }
        Command::Screenings { movie, theater } => {
            let screenings = match (movie, theater) {
                (Some(movie), _) => {
                    client
                        .screenings()
                        .fetch_screenings_by_movie(MovieId(movie))
                        .await?
                }
                (None, Some(theater)) => {
                    client
                        .screenings()
                        .fetch_screenings_by_theater(TheaterId(theater))
                        .await?
                }
                (None, None) => client.screenings().fetch_screenings().await?,
            };
            print(&screenings)?;
        }
        Command::Seats { screening } => {
            let seats = client
                .screenings()
                .fetch_available_seats(ScreeningId(screening))
                .await?;
            print(&seats)?;
        }
        Command::Theaters { theater_type } => {
            let theaters = match theater_type {
                Some(theater_type) => client.theaters().fetch_theaters_by_type(&theater_type).await?,
                None => client.theaters().fetch_theaters().await?,
            };
            print(&theaters)?;
        }
        Command::Reservations => {
            print(&client.reservations().fetch_user_reservations().await?)?
        }
        Command::Book { screening, seats } => {
            let reservation = client
                .reservations()
                .create_reservation(&ReservationDraft {
                    screening_id: ScreeningId(screening),
                    seats: seats.into_iter().map(SeatId).collect(),
                    status: None,
                })
                .await?;
            print(&reservation)?;
        }
        Command::Cancel { reservation } => {
            client
                .reservations()
                .cancel_reservation(ReservationId(reservation))
                .await?;
            println!("reservation {reservation} cancelled");
        }
        Command::Pay {
            reservation,
            amount,
            method,
        } => {
            let payment = client
                .reservations()
                .process_payment(&PaymentRequest {
                    reservation_id: ReservationId(reservation),
                    amount,
                    method,
                })
                .await?;
            print(&payment)?;
        }
        Command::Ticket { id, dir } => {
            let path = client.reservations().save_ticket(TicketId(id), &dir).await?;
            println!("{}", path.display());
        }
        Command::Admin(command) => run_admin(&client, command).await?,
    }

    Ok(())
}

async fn run_admin(client: &CinemaClient, command: AdminCommand) -> Result<()> {
    let admin = client.admin();
    match command {
        AdminCommand::Dashboard => print(&admin.fetch_dashboard().await?),
        AdminCommand::Occupancy => print(&admin.fetch_screening_occupancy().await?),
        AdminCommand::Revenue => print(&admin.fetch_movie_revenue().await?),
        AdminCommand::Users => print(&admin.fetch_users().await?),
        AdminCommand::Promote { user, revoke } => {
            let role = if revoke { Role::User } else { Role::Admin };
            print(&admin.update_user_role(UserId(user), role).await?)
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
