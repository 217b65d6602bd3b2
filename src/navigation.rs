//! The navigation bar. Section links and log out sit across the top, and on
//! small screens the section links move to a bar at the bottom.

use maud::{Markup, html};

use crate::endpoints;

/// The sections of the app and their link text, in display order.
const SECTIONS: [(&str, &str); 5] = [
    (endpoints::DASHBOARD_VIEW, "Dashboard"),
    (endpoints::NEW_EXPENSE_VIEW, "Add Expense"),
    (endpoints::EXPENSES_VIEW, "History"),
    (endpoints::BUDGETS_VIEW, "Budgets"),
    (endpoints::CATEGORIES_VIEW, "Categories"),
];

const TOP_LINK_STYLE: &str = "text-gray-900 hover:text-blue-700 dark:text-white \
    dark:hover:text-blue-500";
const TOP_ACTIVE_LINK_STYLE: &str = "text-blue-700 dark:text-blue-500";
const BOTTOM_LINK_STYLE: &str = "flex items-center justify-center rounded-lg px-1 py-2 \
    text-xs font-semibold text-gray-600 hover:bg-blue-50/70 hover:text-blue-700 \
    dark:text-gray-300 dark:hover:bg-blue-900/20 dark:hover:text-blue-200";
const BOTTOM_ACTIVE_LINK_STYLE: &str = "flex items-center justify-center rounded-lg px-1 py-2 \
    text-xs font-semibold bg-blue-50 text-blue-700 shadow-sm \
    dark:bg-blue-900/30 dark:text-blue-200";

/// The section `endpoint` belongs to.
///
/// Pages nested under a section, e.g. "/budgets/new", belong to it unless
/// they are a section of their own like "/expenses/new".
fn section_of(endpoint: &str) -> Option<&'static str> {
    SECTIONS
        .iter()
        .map(|(url, _)| *url)
        .filter(|url| {
            endpoint == *url
                || endpoint
                    .strip_prefix(url)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|url| url.len())
}

pub struct NavBar {
    active_section: Option<&'static str>,
}

impl NavBar {
    /// Get the navigation bar with the section containing `active_endpoint`
    /// highlighted.
    pub fn new(active_endpoint: &str) -> NavBar {
        NavBar {
            active_section: section_of(active_endpoint),
        }
    }

    fn is_active(&self, url: &str) -> bool {
        self.active_section == Some(url)
    }

    pub fn into_html(self) -> Markup {
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900" data-nav="top"
            {
                div class="max-w-screen-xl flex items-center justify-between mx-auto p-4"
                {
                    a href=(endpoints::ROOT) class="flex items-center space-x-3"
                    {
                        img src="/static/favicon-128x128.png" alt="Spendwise Logo" class="h-8";

                        span class="text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Spendwise"
                        }
                    }

                    ul class="hidden lg:flex lg:space-x-8 font-medium"
                    {
                        @for (url, title) in SECTIONS {
                            @let is_active = self.is_active(url);
                            @let style = if is_active { TOP_ACTIVE_LINK_STYLE } else { TOP_LINK_STYLE };

                            li {
                                a
                                    href=(url)
                                    class=(style)
                                    aria-current=[is_active.then_some("page")]
                                {
                                    (title)
                                }
                            }
                        }
                    }

                    a href=(endpoints::LOG_OUT) class=(TOP_LINK_STYLE) { "Log out" }
                }
            }

            nav class="fixed inset-x-0 bottom-0 z-40 lg:hidden" data-nav="bottom"
            {
                ul
                    class="mx-4 mb-4 grid grid-cols-5 gap-1 rounded-xl border border-gray-200
                    bg-white/95 p-2 shadow-lg backdrop-blur dark:border-gray-700 dark:bg-gray-900/95"
                    aria-label="Primary"
                {
                    @for (url, title) in SECTIONS {
                        @let is_active = self.is_active(url);
                        @let style = if is_active { BOTTOM_ACTIVE_LINK_STYLE } else { BOTTOM_LINK_STYLE };

                        li class="min-w-0" {
                            a
                                href=(url)
                                class=(style)
                                aria-current=[is_active.then_some("page")]
                            {
                                span class="truncate" { (title) }
                            }
                        }
                    }
                }
            }
        )
    }
}
