use chrono::Utc;
use mongodb::{bson::doc, Client};
use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{auth::AuthToken, invitation::RedeemResponse},
    db::{
        invitation::{Invitation, InvitationState},
        voter::Voter,
    },
    mongodb::Coll,
};

use super::common::voter_by_token;

pub fn routes() -> Vec<Route> {
    routes![redeem_invitation]
}

#[post("/invitations/<code>/redeem")]
async fn redeem_invitation(
    token: AuthToken<Voter>,
    code: String,
    voters: Coll<Voter>,
    invitations: Coll<Invitation>,
    db_client: &State<Client>,
) -> Result<Json<RedeemResponse>> {
    let voter = voter_by_token(&token, &voters).await?;

    let invitation = invitations
        .find_one(doc! { "code": &code }, None)
        .await?
        .ok_or(Error::InvitationNotFound)?;
    match invitation.state(Utc::now()) {
        InvitationState::Expired => return Err(Error::InvitationExpired),
        InvitationState::AlreadyUsed => return Err(Error::InvitationAlreadyUsed),
        InvitationState::Redeemable => {}
    }

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    if invitation.is_personal() {
        // The conditional update serialises concurrent redemptions of the
        // same code: exactly one of them flips `used`.
        let claimed = invitations
            .update_one_with_session(
                doc! { "code": &code, "used": false },
                doc! { "$set": { "used": true, "used_by": *voter.id } },
                None,
                &mut session,
            )
            .await?;
        if claimed.modified_count == 0 {
            session.abort_transaction().await?;
            return Err(Error::InvitationAlreadyUsed);
        }
    }

    // Redeeming twice is harmless; the grant is a set.
    voters
        .update_one_with_session(
            voter.id.as_doc(),
            doc! { "$addToSet": { "invited_elections": invitation.election_id } },
            None,
            &mut session,
        )
        .await?;

    session.commit_transaction().await?;
    info!(
        "voter {} redeemed an invitation for election {}",
        voter.id, invitation.election_id
    );

    Ok(Json(RedeemResponse {
        election_id: invitation.election_id,
    }))
}
