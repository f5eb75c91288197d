use mongodb::{bson::doc, Client};
use rocket::{serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        election::{ElectionDescription, ElectionSpec},
        invitation::{InvitationDescription, InvitationSpec},
    },
    common::election::{ElectionId, Visibility},
    db::{
        admin::Admin,
        election::Election,
        invitation::{Invitation, InvitationCore, NewInvitation},
    },
    mongodb::{Coll, Counter, ELECTION_ID_COUNTER_ID},
};

use super::common::election_by_id;

pub fn routes() -> Vec<Route> {
    routes![create_election, issue_invitation]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    invitations: Coll<NewInvitation>,
    counters: Coll<Counter>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    // Allocating the ID outside the transaction at worst burns a number.
    let election_id = Counter::next(&counters, ELECTION_ID_COUNTER_ID).await?;
    let election = spec.0.into_election(election_id, token.id)?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    elections
        .insert_one_with_session(&election, None, &mut session)
        .await?;
    // Private elections are born with their shared redemption link.
    if election.visibility == Visibility::Private {
        invitations
            .insert_one_with_session(&InvitationCore::new_shared(election.id), None, &mut session)
            .await?;
    }

    session.commit_transaction().await?;
    info!("admin {} created election {}", token.id, election.id);

    Ok(Json(election.into()))
}

#[post(
    "/elections/<election_id>/invitations",
    data = "<spec>",
    format = "json"
)]
async fn issue_invitation(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<InvitationSpec>,
    elections: Coll<Election>,
    invitations: Coll<Invitation>,
    new_invitations: Coll<NewInvitation>,
    config: &State<Config>,
) -> Result<Json<InvitationDescription>> {
    let election = election_by_id(election_id, &elections).await?;
    if election.visibility != Visibility::Private {
        return Err(Error::BadRequest(format!(
            "election {election_id} is public and needs no invitations"
        )));
    }

    // Issuing is a get-or-create per (election, email): re-requesting an
    // invitation hands back the existing code instead of minting another.
    let existing = invitations
        .find_one(
            doc! { "election_id": election.id, "email": spec.email.clone() },
            None,
        )
        .await?;
    if let Some(invitation) = existing {
        return Ok(Json(InvitationDescription::new(&invitation, config)));
    }

    let expires_at = spec.expires_at.unwrap_or(election.end_date);
    let invitation = match &spec.email {
        Some(email) => InvitationCore::new_personal(election.id, email, Some(expires_at)),
        None => {
            let mut shared = InvitationCore::new_shared(election.id);
            shared.expires_at = spec.expires_at;
            shared
        }
    };
    new_invitations.insert_one(&invitation, None).await?;

    Ok(Json(InvitationDescription::new(&invitation, config)))
}
