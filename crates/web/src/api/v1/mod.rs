use axum::{routing::on, Router};
use dispatch::database::Database;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod board;
mod directory;
mod trips;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/board", board::routes(state.clone()))
        .nest_service("/trips", trips::routes(state.clone()))
        .merge(directory::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
