//! Terminal-state page rendering contract.
//!
//! Each terminal state of the registration flow maps to exactly one page
//! variant. Rich theming belongs to an external collaborator behind
//! [`PageRenderer`]; the built-in [`HtmlRenderer`] produces a minimal themed
//! page so every failure is a human-readable document, never a stack trace.

// self
use crate::_prelude::*;

/// Page variant, one per terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
	/// Leg A completed for a previously-unseen registrant.
	Registered,
	/// Leg A completed but the registrant already had a roster row.
	AlreadyRegistered,
	/// Leg B completed and the registrant was newly joined to the guild.
	GuildJoined,
	/// Leg B completed for an existing guild member; roles were (re)granted.
	RolesUpdated,
	/// The registrant denied a provider's consent screen.
	Denied,
	/// The registration deadline has passed.
	Expired,
	/// The account is restricted; registration refused, nothing persisted.
	Restricted,
	/// Missing/garbled correlation token, missing code, or a rejected code.
	Unauthorized,
	/// Any other handled failure.
	Error,
}
impl PageKind {
	/// Returns the page title suffix appended to the tournament acronym.
	pub const fn title(self) -> &'static str {
		match self {
			PageKind::Registered => "Player Registration",
			PageKind::AlreadyRegistered => "Player Already Registered",
			PageKind::GuildJoined => "Server Joined Successfully",
			PageKind::RolesUpdated => "Roles Updated",
			PageKind::Denied => "Authorization Failed",
			PageKind::Expired => "Registration Period Over",
			PageKind::Restricted => "Registration Refused",
			PageKind::Unauthorized => "Unauthorized",
			PageKind::Error => "Error",
		}
	}
}

/// Outcome-specific parameters handed to the renderer.
#[derive(Clone, Debug)]
pub struct PageContext {
	/// Page variant being rendered.
	pub kind: PageKind,
	/// Tournament acronym for the title.
	pub acronym: String,
	/// Registrant username, when resolved.
	pub username: Option<String>,
	/// Registrant rank, when resolved.
	pub rank: Option<u64>,
	/// Chat tag, when resolved.
	pub tag: Option<String>,
	/// Link continuing to the chat leg, on leg-A completion pages.
	pub continue_url: Option<Url>,
	/// Human-readable deadline, on the expired page.
	pub deadline: Option<String>,
	/// Short human-readable failure description, on failure pages.
	pub detail: Option<String>,
}
impl PageContext {
	/// Creates a context with no outcome parameters.
	pub fn new(kind: PageKind, acronym: impl Into<String>) -> Self {
		Self {
			kind,
			acronym: acronym.into(),
			username: None,
			rank: None,
			tag: None,
			continue_url: None,
			deadline: None,
			detail: None,
		}
	}

	/// Attaches the registrant's username.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Attaches the registrant's rank.
	pub fn with_rank(mut self, rank: Option<u64>) -> Self {
		self.rank = rank;

		self
	}

	/// Attaches the resolved chat tag.
	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tag = Some(tag.into());

		self
	}

	/// Attaches the chat-leg continuation link.
	pub fn with_continue_url(mut self, url: Url) -> Self {
		self.continue_url = Some(url);

		self
	}

	/// Attaches the human-readable deadline.
	pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
		self.deadline = Some(deadline.into());

		self
	}

	/// Attaches a short failure description.
	pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
		self.detail = Some(detail.into());

		self
	}
}

/// Fully rendered page returned to the transport layer.
#[derive(Clone, Debug)]
pub struct RenderedPage {
	/// Page variant that was rendered.
	pub kind: PageKind,
	/// Document title (`{acronym} - {variant title}`).
	pub title: String,
	/// HTML document body.
	pub html: String,
}

/// Rendering contract implemented by the page collaborator.
pub trait PageRenderer
where
	Self: Send + Sync,
{
	/// Maps a terminal state to its user-facing page.
	fn render(&self, context: &PageContext) -> RenderedPage;
}

/// Built-in minimal themed renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;
impl HtmlRenderer {
	fn body(context: &PageContext) -> String {
		let mut body = String::new();

		match context.kind {
			PageKind::Registered => {
				body.push_str("<p>You are registered");
				push_player(&mut body, context);
				body.push_str(".</p>");
				push_continue(&mut body, context);
			},
			PageKind::AlreadyRegistered => {
				body.push_str("<p>You are already registered");
				push_player(&mut body, context);
				body.push_str(".</p>");
				push_continue(&mut body, context);
			},
			PageKind::GuildJoined => {
				body.push_str("<p>Welcome aboard");
				push_tag(&mut body, context);
				body.push_str("! You have joined the tournament server.</p>");
			},
			PageKind::RolesUpdated => {
				body.push_str("<p>You were already on the tournament server");
				push_tag(&mut body, context);
				body.push_str("; your roles have been updated.</p>");
			},
			PageKind::Denied =>
				body.push_str("<p>Authorization was denied. Restart the sign-up flow to try again.</p>"),
			PageKind::Expired => {
				body.push_str("<p>The registration period is over.</p>");

				if let Some(deadline) = &context.deadline {
					body.push_str(&format!(
						"<p>Registrations closed on {}.</p>",
						escape(deadline)
					));
				}
			},
			PageKind::Restricted => body.push_str(
				"<p>This account is restricted and cannot be registered for the tournament.</p>",
			),
			PageKind::Unauthorized => body.push_str(
				"<p>This request could not be authorized. Restart the sign-up flow from the tournament post.</p>",
			),
			PageKind::Error => {
				body.push_str("<p>Something went wrong while processing your registration. The staff has been notified.</p>");

				if let Some(detail) = &context.detail {
					body.push_str(&format!("<p><small>{}</small></p>", escape(detail)));
				}
			},
		}

		body
	}
}
impl PageRenderer for HtmlRenderer {
	fn render(&self, context: &PageContext) -> RenderedPage {
		let title = format!("{} - {}", context.acronym, context.kind.title());
		let html = format!(
			"<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
			<body><h1>{}</h1>{}</body></html>",
			escape(&title),
			escape(&title),
			Self::body(context),
		);

		RenderedPage { kind: context.kind, title, html }
	}
}

fn push_player(body: &mut String, context: &PageContext) {
	if let Some(username) = &context.username {
		body.push_str(&format!(", <b>{}</b>", escape(username)));
	}
	if let Some(rank) = context.rank {
		body.push_str(&format!(" (rank #{rank})"));
	}
}

fn push_tag(body: &mut String, context: &PageContext) {
	if let Some(tag) = &context.tag {
		body.push_str(&format!(", <b>{}</b>", escape(tag)));
	}
}

fn push_continue(body: &mut String, context: &PageContext) {
	if let Some(url) = &context.continue_url {
		body.push_str(&format!(
			"<p><a href=\"{}\">Link your chat account to finish signing up.</a></p>",
			escape(url.as_str()),
		));
	}
}

fn escape(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
}
