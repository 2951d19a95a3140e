//! GraphQL documents used to copy discussions.

pub const DISCUSSIONS_ENABLED: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    hasDiscussionsEnabled
    id
  }
}
"#;

pub const CATEGORIES: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    discussionCategories(first: 100) {
      nodes { id name slug }
    }
  }
}
"#;

pub const LABELS: &str = r#"
query($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    labels(first: 100) {
      nodes { id name color description }
    }
  }
}
"#;

pub const DISCUSSIONS: &str = r#"
query($owner: String!, $repo: String!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    discussions(first: 100, after: $cursor, orderBy: {field: CREATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        id
        title
        body
        category { id name slug }
        labels(first: 100) {
          nodes { id name color description }
        }
        author { login }
        createdAt
        closed
        url
        number
      }
    }
  }
}
"#;

pub const DISCUSSION_COMMENTS: &str = r#"
query($discussionId: ID!) {
  node(id: $discussionId) {
    ... on Discussion {
      comments(first: 100) {
        nodes {
          id
          body
          author { login }
          createdAt
          replies(first: 50) {
            nodes {
              id
              body
              author { login }
              createdAt
            }
          }
        }
      }
    }
  }
}
"#;

pub const CREATE_DISCUSSION: &str = r#"
mutation($repositoryId: ID!, $categoryId: ID!, $title: String!, $body: String!) {
  createDiscussion(input: {repositoryId: $repositoryId, categoryId: $categoryId, title: $title, body: $body}) {
    discussion { id title url number }
  }
}
"#;

pub const CREATE_LABEL: &str = r#"
mutation($repositoryId: ID!, $name: String!, $color: String!, $description: String) {
  createLabel(input: {repositoryId: $repositoryId, name: $name, color: $color, description: $description}) {
    label { id name }
  }
}
"#;

pub const ADD_LABELS: &str = r#"
mutation($labelableId: ID!, $labelIds: [ID!]!) {
  addLabelsToLabelable(input: {labelableId: $labelableId, labelIds: $labelIds}) {
    clientMutationId
  }
}
"#;

pub const ADD_COMMENT: &str = r#"
mutation($discussionId: ID!, $body: String!) {
  addDiscussionComment(input: {discussionId: $discussionId, body: $body}) {
    comment { id }
  }
}
"#;

pub const ADD_REPLY: &str = r#"
mutation($discussionId: ID!, $replyToId: ID!, $body: String!) {
  addDiscussionComment(input: {discussionId: $discussionId, replyToId: $replyToId, body: $body}) {
    comment { id }
  }
}
"#;

pub const CLOSE_DISCUSSION: &str = r#"
mutation($discussionId: ID!, $reason: DiscussionCloseReason) {
  closeDiscussion(input: {discussionId: $discussionId, reason: $reason}) {
    discussion { id closed }
  }
}
"#;
